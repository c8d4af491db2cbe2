/*
 * Responsibility
 * - GET /health (疎通用, Bearer 不要)
 * - どの tenant 向けに起動しているかを返す (key set は起動時に取得済み)
 */
use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tenant": state.validator.tenant_id(),
    }))
}
