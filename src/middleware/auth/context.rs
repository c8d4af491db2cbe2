//! Request-scoped slot for validated claims.
//!
//! Claims live in request extensions under a private wrapper type, so only
//! this crate's middleware can attach them and no other extension can collide
//! with (or forge) them. Readers go through the accessors below.
use std::sync::Arc;

use axum::http::{Extensions, Request};

use crate::services::auth::UserClaims;

#[derive(Clone)]
struct ClaimsSlot(Arc<UserClaims>);

pub(crate) fn attach(extensions: &mut Extensions, claims: UserClaims) {
    extensions.insert(ClaimsSlot(Arc::new(claims)));
}

/// Claims attached by the bearer middleware, or `None` when it did not run.
pub fn claims_from_extensions(extensions: &Extensions) -> Option<Arc<UserClaims>> {
    extensions.get::<ClaimsSlot>().map(|slot| slot.0.clone())
}

pub fn claims_from_request<B>(req: &Request<B>) -> Option<Arc<UserClaims>> {
    claims_from_extensions(req.extensions())
}
