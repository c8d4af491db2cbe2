//! Azure AD / Entra ID bearer token validation.
//!
//! Pipeline (each stage short-circuits):
//! 1. structural parse of the header
//! 2. algorithm restriction (RS256 only)
//! 3. key resolution (v2.0 set, then v1) + signature / `exp` / `nbf`
//! 4. issuer must be one of the two tenant-derived issuers
//! 5. audience intersection (unless disabled)
//! 6. claims normalization (never fails)
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use tokio_util::sync::CancellationToken;
use tracing::Dispatch;

use crate::services::auth::claims::{RawClaims, UserClaims, audience_claim, string_claim};
use crate::services::auth::error::{AuthError, InvalidTokenReason, ValidatorError};
use crate::services::auth::jwks::{JwksCache, JwksOptions};
use crate::services::auth::resolver::{DualKeySet, KeyResolver};

pub const DEFAULT_AUTHORITY_HOST: &str = "login.microsoftonline.com";
pub const DEFAULT_STS_HOST: &str = "sts.windows.net";

/// Construction options for [`Validator`].
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Accepted `aud` values. Required while `audience_check` is on.
    pub audiences: Vec<String>,
    /// Reject tokens whose audiences do not intersect `audiences`.
    pub audience_check: bool,
    /// Sink for validator events. `None` uses the process default subscriber.
    pub logger: Option<Dispatch>,
    /// Login host; discovery URLs and the v2.0 issuer derive from it.
    pub authority_host: String,
    /// Host of the v1 issuer.
    pub sts_host: String,
    /// Clock skew allowed on `exp` / `nbf`, in seconds.
    pub leeway_seconds: u64,
    pub jwks: JwksOptions,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            audiences: Vec::new(),
            audience_check: true,
            logger: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            sts_host: DEFAULT_STS_HOST.to_string(),
            leeway_seconds: 60,
            jwks: JwksOptions::default(),
        }
    }
}

impl ValidatorOptions {
    pub fn with_audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audiences = audiences.into_iter().map(Into::into).collect();
        self
    }

    /// Turn off the audience check. Not recommended in production.
    pub fn without_audience_validation(mut self) -> Self {
        self.audience_check = false;
        self
    }

    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }
}

/// `https://<authority>/<tenant>/discovery/keys`
pub fn jwks_v1_url(authority_host: &str, tenant_id: &str) -> String {
    format!("https://{authority_host}/{tenant_id}/discovery/keys")
}

/// `https://<authority>/<tenant>/discovery/v2.0/keys`
pub fn jwks_v2_url(authority_host: &str, tenant_id: &str) -> String {
    format!("https://{authority_host}/{tenant_id}/discovery/v2.0/keys")
}

/// The v1 (`sts`) and v2.0 (`login`) issuers for a tenant.
pub fn tenant_issuers(options: &ValidatorOptions, tenant_id: &str) -> [String; 2] {
    [
        format!("https://{}/{tenant_id}/", options.sts_host),
        format!("https://{}/{tenant_id}/v2.0", options.authority_host),
    ]
}

/// Validates bearer tokens for one tenant. Immutable after construction and
/// safe to share across requests.
pub struct Validator {
    tenant_id: String,
    keys: DualKeySet,
    valid_issuers: [String; 2],
    valid_audiences: Vec<String>,
    audience_check: bool,
    validation: Validation,
    logger: Option<Dispatch>,
}

impl Validator {
    /// Build a validator backed by the tenant's v1 and v2.0 discovery
    /// endpoints. Both key sets are fetched before this returns; their
    /// background refresh runs until `cancel` is cancelled.
    pub async fn new(
        tenant_id: &str,
        cancel: CancellationToken,
        options: ValidatorOptions,
    ) -> Result<Self, ValidatorError> {
        let tenant_id = check_invariants(tenant_id, &options)?;

        let client = reqwest::Client::builder()
            .timeout(options.jwks.fetch_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ValidatorError::HttpClient)?;

        let v1 = JwksCache::new(
            jwks_v1_url(&options.authority_host, tenant_id),
            client.clone(),
            options.jwks.clone(),
            &cancel,
        )
        .await
        .map_err(|source| ValidatorError::KeySet {
            version: "v1",
            source,
        })?;

        let v2 = JwksCache::new(
            jwks_v2_url(&options.authority_host, tenant_id),
            client,
            options.jwks.clone(),
            &cancel,
        )
        .await
        .map_err(|source| ValidatorError::KeySet {
            version: "v2.0",
            source,
        })?;

        let keys = DualKeySet::new(Arc::new(v2), Arc::new(v1));
        Self::with_key_sets(tenant_id, keys, options)
    }

    /// Build a validator over caller-managed key sets.
    pub fn with_key_sets(
        tenant_id: &str,
        keys: DualKeySet,
        options: ValidatorOptions,
    ) -> Result<Self, ValidatorError> {
        let tenant_id = check_invariants(tenant_id, &options)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = options.leeway_seconds;
        validation.validate_nbf = true;
        // iss / aud are checked by hand so each gets its own error.
        validation.validate_aud = false;

        let valid_issuers = tenant_issuers(&options, tenant_id);

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            keys,
            valid_issuers,
            valid_audiences: options.audiences,
            audience_check: options.audience_check,
            validation,
            logger: options.logger,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn valid_issuers(&self) -> &[String] {
        &self.valid_issuers
    }

    pub fn valid_audiences(&self) -> &[String] {
        &self.valid_audiences
    }

    pub fn audience_check_enabled(&self) -> bool {
        self.audience_check
    }

    /// Run the full validation pipeline on a raw token.
    pub fn validate_token(&self, token: &str) -> Result<UserClaims, AuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(AuthError::TokenParsingFailed)?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::TokenParsingFailed(
                ErrorKind::InvalidAlgorithm.into(),
            ));
        }

        let kid = header
            .kid
            .as_deref()
            .ok_or(AuthError::TokenInvalid(InvalidTokenReason::MissingKeyId))?;

        let key = self
            .keys
            .resolve(kid)
            .map_err(|e| AuthError::TokenInvalid(e.into()))?;

        let data = jsonwebtoken::decode::<RawClaims>(token, &key, &self.validation)
            .map_err(classify_decode_error)?;
        let raw = data.claims;

        let issuer = string_claim(&raw, "iss");
        if !self.valid_issuers.contains(&issuer) {
            return Err(AuthError::InvalidIssuer { received: issuer });
        }

        if self.audience_check {
            let audience = audience_claim(&raw);
            if !audiences_intersect(&self.valid_audiences, &audience) {
                return Err(AuthError::InvalidAudience { received: audience });
            }
        }

        Ok(UserClaims::from_raw(raw))
    }

    /// Emit events to the configured sink, or the default subscriber.
    pub(crate) fn log<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.logger {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("Validator")
            .field("tenant_id", &self.tenant_id)
            .field("valid_issuers", &self.valid_issuers)
            .field("valid_audiences", &self.valid_audiences)
            .field("audience_check", &self.audience_check)
            .finish_non_exhaustive()
    }
}

/// Returns the trimmed tenant id; it is spliced into URLs and issuers as is.
fn check_invariants<'a>(
    tenant_id: &'a str,
    options: &ValidatorOptions,
) -> Result<&'a str, ValidatorError> {
    let tenant_id = tenant_id.trim();
    if tenant_id.is_empty() {
        return Err(ValidatorError::EmptyTenant);
    }
    if tenant_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '%' | '\\'))
    {
        return Err(ValidatorError::InvalidTenant(tenant_id.to_string()));
    }
    if options.audience_check && options.audiences.is_empty() {
        return Err(ValidatorError::AudiencesRequired);
    }
    Ok(tenant_id)
}

// Malformed payloads are parse failures; everything else (signature, key,
// time claims) means the token itself is not acceptable.
fn classify_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::TokenParsingFailed(err)
        }
        _ => AuthError::TokenInvalid(InvalidTokenReason::Verification(err)),
    }
}

fn audiences_intersect(valid: &[String], token: &[String]) -> bool {
    token.iter().any(|aud| valid.contains(aud))
}
