//! Error types for bearer token validation.
//!
//! - `AuthError`: per-request failures (extraction + validation)
//! - `KeySetError`: signing key set fetch / lookup failures
//! - `ValidatorError`: construction-time failures (fatal to startup)
use thiserror::Error;

/// Message returned to clients for every validation-stage failure.
pub const TOKEN_INVALID_MESSAGE: &str = "token is invalid (possibly expired or not yet active)";

/// Per-request authentication failures.
///
/// The first two are client-input errors and are safe to return verbatim.
/// The rest are validation-stage errors: they are logged with full detail but
/// collapse to `TOKEN_INVALID_MESSAGE` toward the client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header is required")]
    MissingAuthHeader,

    #[error("authorization header format must be 'Bearer {{token}}'")]
    InvalidAuthHeaderFormat,

    #[error("failed to parse token: {0}")]
    TokenParsingFailed(#[source] jsonwebtoken::errors::Error),

    #[error("token is invalid (possibly expired or not yet active): {0}")]
    TokenInvalid(#[source] InvalidTokenReason),

    #[error("invalid token issuer. Received: {received}")]
    InvalidIssuer { received: String },

    #[error("invalid token audience. Received: {received:?}")]
    InvalidAudience { received: Vec<String> },
}

impl AuthError {
    /// Extraction-stage errors are returned to the client as-is.
    pub fn is_client_input(&self) -> bool {
        matches!(self, Self::MissingAuthHeader | Self::InvalidAuthHeaderFormat)
    }

    /// Message safe to put in a response body.
    pub fn public_message(&self) -> String {
        if self.is_client_input() {
            self.to_string()
        } else {
            TOKEN_INVALID_MESSAGE.to_string()
        }
    }
}

/// Why signature verification (stage 3) rejected a token.
#[derive(Debug, Error)]
pub enum InvalidTokenReason {
    #[error("token header has no key identifier")]
    MissingKeyId,

    #[error(transparent)]
    KeyResolution(#[from] KeySetError),

    #[error("verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),
}

/// Key set cache errors.
#[derive(Debug, Clone, Error)]
pub enum KeySetError {
    #[error("failed to fetch JWKS from {url}: {error}")]
    FetchFailed { url: String, error: String },

    #[error("failed to parse JWKS from {url}: {error}")]
    ParseFailed { url: String, error: String },

    #[error("key not found in JWKS: kid={kid} url={url}")]
    KeyNotFound { kid: String, url: String },
}

/// Construction-time errors. Never recovered locally.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("tenant id must not be empty")]
    EmptyTenant,

    #[error("tenant id {0:?} contains characters not allowed in a URL path segment")]
    InvalidTenant(String),

    #[error("audience validation is enabled but no valid audiences were provided")]
    AudiencesRequired,

    #[error("failed to build JWKS http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to initialize {version} key set: {source}")]
    KeySet {
        version: &'static str,
        #[source]
        source: KeySetError,
    },
}
