//! JWKS (JSON Web Key Set) fetcher and cache.
//!
//! One `JwksCache` per discovery URL. Keys are fetched once at construction
//! (failure is fatal) and then refreshed by a background task until the
//! caller's cancellation scope ends.
//!
//! Cache behavior:
//! - Lookups are in-memory only; they never wait on a fetch.
//! - A refresh replaces the whole `kid -> key` map. A failed refresh keeps the
//!   previous map (stale keys are served rather than failing closed).
//! - A `resolve` miss asks the background task to refresh early, at most once
//!   per `unknown_kid_refresh_limit`. A plain `lookup` never does.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::services::auth::error::KeySetError;
use crate::services::auth::resolver::KeyResolver;

/// Verification keys indexed by `kid`.
pub(crate) type KeyMap = HashMap<String, DecodingKey>;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Refresh and fetch tuning for a key set cache.
#[derive(Debug, Clone)]
pub struct JwksOptions {
    /// How often the background task re-fetches the key set.
    pub refresh_interval: Duration,
    /// Minimum time between early refreshes triggered by unknown `kid`s.
    pub unknown_kid_refresh_limit: Duration,
    /// Timeout for one JWKS HTTP fetch (connect + response).
    pub fetch_timeout: Duration,
}

impl Default for JwksOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60 * 60),
            unknown_kid_refresh_limit: Duration::from_secs(5 * 60),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

// Shape of a JWKS document. Keys stay untyped so one bad entry does not
// reject the whole set.
#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<serde_json::Value>,
}

struct Inner {
    url: String,
    client: reqwest::Client,
    options: JwksOptions,
    keys: RwLock<Arc<KeyMap>>,
    refresh_hint: Notify,
    last_hint: Mutex<Option<Instant>>,
}

/// Background-refreshed signing key set for one discovery URL.
pub struct JwksCache {
    inner: Arc<Inner>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl JwksCache {
    /// Fetch the key set once and start the background refresh task.
    ///
    /// The task stops when `cancel` is cancelled, when `shutdown()` is called,
    /// or when the cache is dropped.
    pub async fn new(
        url: impl Into<String>,
        client: reqwest::Client,
        options: JwksOptions,
        cancel: &CancellationToken,
    ) -> Result<Self, KeySetError> {
        let url = url.into();
        let keys = fetch_key_map(&client, &url, options.fetch_timeout).await?;

        tracing::info!(url = %url, kid_count = keys.len(), "JWKS cached");

        let inner = Arc::new(Inner {
            url,
            client,
            options,
            keys: RwLock::new(Arc::new(keys)),
            refresh_hint: Notify::new(),
            last_hint: Mutex::new(None),
        });

        let shutdown = cancel.child_token();
        let task = tokio::spawn(refresh_loop(inner.clone(), shutdown.clone()));

        Ok(Self {
            inner,
            shutdown,
            task,
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Key ids currently cached (unordered).
    pub fn key_ids(&self) -> Vec<String> {
        self.inner.snapshot().keys().cloned().collect()
    }

    /// Fetch now and replace the cached keys. On error the current keys stay.
    pub async fn refresh(&self) -> Result<usize, KeySetError> {
        self.inner.refresh().await
    }

    /// Stop the background refresh task. Cached keys remain usable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether the background refresh task is still running.
    pub fn is_refreshing(&self) -> bool {
        !self.task.is_finished()
    }
}

impl KeyResolver for JwksCache {
    fn lookup(&self, kid: &str) -> Result<DecodingKey, KeySetError> {
        self.inner
            .snapshot()
            .get(kid)
            .cloned()
            .ok_or_else(|| KeySetError::KeyNotFound {
                kid: kid.to_string(),
                url: self.inner.url.clone(),
            })
    }

    fn request_refresh(&self) {
        self.inner.hint_refresh();
    }
}

impl Drop for JwksCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("url", &self.inner.url)
            .field("cached_keys", &self.inner.snapshot().len())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Inner {
    fn snapshot(&self) -> Arc<KeyMap> {
        self.keys.read().clone()
    }

    async fn refresh(&self) -> Result<usize, KeySetError> {
        let keys = fetch_key_map(&self.client, &self.url, self.options.fetch_timeout).await?;
        let count = keys.len();
        *self.keys.write() = Arc::new(keys);
        Ok(count)
    }

    fn hint_refresh(&self) {
        let mut last = self.last_hint.lock();
        if let Some(at) = *last {
            if at.elapsed() < self.options.unknown_kid_refresh_limit {
                return;
            }
        }
        *last = Some(Instant::now());
        self.refresh_hint.notify_one();
    }
}

async fn refresh_loop(inner: Arc<Inner>, shutdown: CancellationToken) {
    let period = inner.options.refresh_interval.max(MIN_REFRESH_INTERVAL);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the initial fetch already happened.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
            _ = inner.refresh_hint.notified() => {
                tracing::debug!(url = %inner.url, "unknown kid, refreshing JWKS early");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = inner.refresh() => match result {
                Ok(kid_count) => {
                    tracing::debug!(url = %inner.url, kid_count, "JWKS refreshed");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "JWKS refresh failed, serving cached keys");
                }
            },
        }
    }

    tracing::debug!(url = %inner.url, "JWKS refresh task stopped");
}

async fn fetch_key_map(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<KeyMap, KeySetError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| KeySetError::FetchFailed {
            url: url.to_string(),
            error: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(KeySetError::FetchFailed {
            url: url.to_string(),
            error: format!("HTTP {}", response.status()),
        });
    }

    let raw: RawJwkSet = response
        .json()
        .await
        .map_err(|e| KeySetError::ParseFailed {
            url: url.to_string(),
            error: e.to_string(),
        })?;

    Ok(build_key_map(raw.keys))
}

/// Build the `kid -> key` map, skipping entries that cannot verify signatures.
pub(crate) fn build_key_map(keys: Vec<serde_json::Value>) -> KeyMap {
    let mut map = KeyMap::new();

    for value in keys {
        let jwk: Jwk = match serde_json::from_value(value) {
            Ok(jwk) => jwk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed JWK");
                continue;
            }
        };

        let Some(kid) = jwk.common.key_id.clone() else {
            tracing::debug!("skipping JWK without kid");
            continue;
        };

        if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            tracing::debug!(kid = %kid, "skipping encryption JWK");
            continue;
        }

        match DecodingKey::from_jwk(&jwk) {
            Ok(key) => {
                map.insert(kid, key);
            }
            Err(e) => {
                tracing::debug!(kid = %kid, error = %e, "skipping JWK (cannot create DecodingKey)");
            }
        }
    }

    map
}
