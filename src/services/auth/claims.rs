//! Normalized view over a validated token's claims.
//!
//! Delegated (user) tokens carry `name`, `preferred_username`, `scp`.
//! Application tokens carry `roles`. Every optional field is read with a
//! type-guarded extraction so a missing or oddly-typed claim never fails the
//! request.
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Raw, untyped claim set as decoded from the token payload.
pub type RawClaims = Map<String, Value>;

/// Which kind of principal the token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Issued on behalf of a signed-in user (has `scp`).
    Delegated,
    /// Issued directly to a service (no `scp`, typically `roles`).
    Application,
}

/// Claims of a validated token. Built once per request, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct UserClaims {
    pub subject: String,
    pub name: String,
    pub preferred_username: String,
    pub tenant_id: String,
    pub audience: Vec<String>,
    pub issuer: String,
    /// Space-separated delegated scopes (`scp`).
    pub scopes: String,
    pub roles: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub raw: RawClaims,
}

impl UserClaims {
    /// Build the normalized view. Never fails.
    pub fn from_raw(raw: RawClaims) -> Self {
        Self {
            subject: string_claim(&raw, "sub"),
            name: string_claim(&raw, "name"),
            preferred_username: string_claim(&raw, "preferred_username"),
            tenant_id: string_claim(&raw, "tid"),
            audience: audience_claim(&raw),
            issuer: string_claim(&raw, "iss"),
            scopes: string_claim(&raw, "scp"),
            roles: string_list_claim(&raw, "roles"),
            expires_at: raw
                .get("exp")
                .and_then(Value::as_i64)
                .and_then(|exp| DateTime::from_timestamp(exp, 0)),
            raw,
        }
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scopes.split_whitespace()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn token_kind(&self) -> TokenKind {
        if self.scopes.is_empty() {
            TokenKind::Application
        } else {
            TokenKind::Delegated
        }
    }

    /// Any claim by name, for claims without a typed field.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }
}

/// String claim, or `""` when absent or not a string.
pub(crate) fn string_claim(raw: &RawClaims, name: &str) -> String {
    raw.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `aud` may be a single string or an array of strings.
pub(crate) fn audience_claim(raw: &RawClaims) -> Vec<String> {
    match raw.get("aud") {
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(_)) => string_list_claim(raw, "aud"),
        _ => Vec::new(),
    }
}

// Non-string elements are dropped; order of the rest is kept.
fn string_list_claim(raw: &RawClaims, name: &str) -> Vec<String> {
    match raw.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
