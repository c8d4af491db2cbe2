//! Bearer token authentication: extract → validate → attach claims.
//!
//! - Missing / malformed `Authorization` header: 401 with that specific reason
//! - Any validation failure: logged with full detail, 401 with a generic reason
//! - Success: claims go into the request-scoped slot, request is forwarded
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, OriginalUri, State},
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::context;
use crate::services::auth::{AuthError, Validator};

const BEARER_PREFIX: &str = "Bearer ";

/// Require a valid bearer token on every route of `router`.
///
/// ```ignore
/// let protected = Router::new().route("/me", get(me));
/// let protected = middleware::auth::bearer::apply(protected, state.validator.clone());
/// ```
pub fn apply<S>(router: Router<S>, validator: Arc<Validator>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(validator, bearer_middleware))
}

async fn bearer_middleware(
    State(validator): State<Arc<Validator>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let instance = request_instance(&req);
    let remote_addr = remote_addr(&req);

    let result = extract_bearer_token(req.headers())
        .and_then(|token| validator.validate_token(token));

    let claims = match result {
        Ok(claims) => claims,
        Err(err) => {
            validator.log(|| {
                tracing::warn!(
                    error = ?err,
                    remote_addr = %remote_addr,
                    "token validation failed"
                )
            });
            return Err(AppError::unauthorized(err.public_message(), instance));
        }
    };

    validator.log(|| tracing::debug!(?claims, "token validated"));

    context::attach(req.extensions_mut(), claims);

    Ok(next.run(req).await)
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively (RFC 6750); the token is taken
/// verbatim.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(header::AUTHORIZATION) {
        None => return Err(AuthError::MissingAuthHeader),
        Some(value) if value.is_empty() => return Err(AuthError::MissingAuthHeader),
        Some(value) => value
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeaderFormat)?,
    };

    match value.get(..BEARER_PREFIX.len()) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case(BEARER_PREFIX) && value.len() > BEARER_PREFIX.len() =>
        {
            Ok(&value[BEARER_PREFIX.len()..])
        }
        _ => Err(AuthError::InvalidAuthHeaderFormat),
    }
}

fn request_instance(req: &Request<Body>) -> String {
    req.extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path())
        .unwrap_or_else(|| req.uri().path())
        .to_string()
}

fn remote_addr(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
