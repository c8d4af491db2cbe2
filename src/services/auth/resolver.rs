//! Key resolution seam used by the validation pipeline.
use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use crate::services::auth::error::KeySetError;

/// Resolves a token's key identifier (`kid`) to a verification key.
///
/// Implementations must be safe for concurrent lookups and must not block on
/// network I/O.
pub trait KeyResolver: Send + Sync {
    /// In-memory lookup with no side effects.
    fn lookup(&self, kid: &str) -> Result<DecodingKey, KeySetError>;

    /// Called once a `kid` could not be resolved anywhere. Sources that can
    /// re-fetch schedule an early refresh here.
    fn request_refresh(&self) {}

    /// `lookup`, then `request_refresh` on a miss.
    fn resolve(&self, kid: &str) -> Result<DecodingKey, KeySetError> {
        let result = self.lookup(kid);
        if result.is_err() {
            self.request_refresh();
        }
        result
    }
}

impl<R: KeyResolver + ?Sized> KeyResolver for Arc<R> {
    fn lookup(&self, kid: &str) -> Result<DecodingKey, KeySetError> {
        (**self).lookup(kid)
    }

    fn request_refresh(&self) {
        (**self).request_refresh()
    }
}

/// Tries the v2.0 key set first, then the v1 key set.
///
/// Tokens may be signed under either set depending on the issuing endpoint and
/// nothing in the token says which, so every lookup is trial-then-fallback.
/// When both miss, the v1 error is returned and both sets are asked to
/// refresh. A v2.0 miss that v1 answers triggers no refresh.
#[derive(Clone)]
pub struct DualKeySet {
    v2: Arc<dyn KeyResolver>,
    v1: Arc<dyn KeyResolver>,
}

impl DualKeySet {
    pub fn new(v2: Arc<dyn KeyResolver>, v1: Arc<dyn KeyResolver>) -> Self {
        Self { v2, v1 }
    }
}

impl KeyResolver for DualKeySet {
    fn lookup(&self, kid: &str) -> Result<DecodingKey, KeySetError> {
        match self.v2.lookup(kid) {
            Ok(key) => Ok(key),
            Err(err) => {
                tracing::trace!(kid, error = %err, "kid not in v2.0 key set, trying v1");
                self.v1.lookup(kid)
            }
        }
    }

    fn request_refresh(&self) {
        self.v2.request_refresh();
        self.v1.request_refresh();
    }
}

impl std::fmt::Debug for DualKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("DualKeySet").finish_non_exhaustive()
    }
}
