/*
 * Responsibility
 * - GET /me: 検証済みトークンの正規化済み claims をそのまま返す
 */
use axum::Json;

use crate::api::v1::extractors::AuthClaims;
use crate::services::auth::UserClaims;

pub async fn me(AuthClaims(claims): AuthClaims) -> Json<UserClaims> {
    Json(UserClaims::clone(&claims))
}
