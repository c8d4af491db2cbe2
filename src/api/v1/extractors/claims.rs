use std::sync::Arc;

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::middleware::auth::claims_from_extensions;
use crate::services::auth::UserClaims;

/// Handler で、検証済み claims を受け取るための extractor
/// bearer middleware が claims を request extensions に格納済みである前提
/// 見つからない場合は middleware と同じ形 (problem+json) の 401 を返す
pub struct AuthClaims(pub Arc<UserClaims>);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        claims_from_extensions(&parts.extensions)
            .map(AuthClaims)
            .ok_or_else(|| {
                let instance = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map(|OriginalUri(uri)| uri.path())
                    .unwrap_or_else(|| parts.uri.path());
                AppError::unauthorized("authentication is required", instance)
            })
    }
}
