/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - validator: Arc<Validator> (tenant の key set を背景で更新し続ける)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::Validator;

#[derive(Clone, Debug)]
pub struct AppState {
    pub validator: Arc<Validator>,
}

impl AppState {
    pub fn new(validator: Arc<Validator>) -> Self {
        Self { validator }
    }
}
