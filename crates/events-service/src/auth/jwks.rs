//! JWKS cache for the identity provider's published signing keys.
//!
//! Keys are fetched from `https://<domain>/.well-known/jwks.json` and held as
//! an immutable [`KeySet`] snapshot. A refresh builds a complete new set and
//! swaps the pointer, so a verification in flight always sees either the old
//! set or the new one, never a mix.
//!
//! # Security
//!
//! - Fetch failures are infrastructure errors ([`KeySetError`]) and are never
//!   reported to callers as credential rejections
//! - Every fetch attempt is bounded by a timeout
//! - HTTPS is used in production (the URL is derived from the domain)

use crate::observability::metrics::record_jwks_fetch;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default per-attempt fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Delay between fetch attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// A public signing key as published in the JWKS document.
///
/// Only RSA keys (`n`/`e`) can verify tokens; other key types are kept so the
/// document still loads, and are rejected when selected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningKey {
    /// Key type ("RSA" for usable keys).
    pub kty: String,

    /// Key ID - matched against the token header's `kid`.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is intended for, if published.
    #[serde(default)]
    pub alg: Option<String>,
}

/// JWKS document returned by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    /// List of JSON Web Keys.
    pub keys: Vec<SigningKey>,
}

/// Immutable snapshot of the key set from one fetch.
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, SigningKey>,
    fetched_at: Instant,
}

impl KeySet {
    /// Build a key set from fetched keys.
    ///
    /// If a key ID appears more than once the first entry is kept.
    pub fn from_keys(keys: Vec<SigningKey>) -> Self {
        let mut map = HashMap::with_capacity(keys.len());
        for key in keys {
            if map.contains_key(&key.kid) {
                tracing::warn!(
                    target: "events.auth.jwks",
                    kid = %key.kid,
                    "Duplicate key id in JWKS document, keeping first entry"
                );
                continue;
            }
            map.insert(key.kid.clone(), key);
        }

        Self {
            keys: map,
            fetched_at: Instant::now(),
        }
    }

    /// Look up a key by ID. Absence is a normal outcome.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// How long ago this set was fetched.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Reasons the key set could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySetError {
    #[error("JWKS request failed: {0}")]
    Transport(String),

    #[error("JWKS request timed out")]
    Timeout,

    #[error("JWKS endpoint returned HTTP {0}")]
    Status(u16),

    #[error("JWKS document is malformed: {0}")]
    Malformed(String),
}

impl KeySetError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            KeySetError::Transport(_) | KeySetError::Timeout => true,
            KeySetError::Status(status) => *status >= 500,
            KeySetError::Malformed(_) => false,
        }
    }
}

/// Source of JWKS documents.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetch the current JWKS document.
    async fn fetch(&self) -> Result<JwksDocument, KeySetError>;
}

/// Fetches the JWKS document over HTTP with bounded retries.
pub struct HttpKeySetFetcher {
    jwks_url: String,
    http_client: reqwest::Client,
    max_retries: u32,
}

impl HttpKeySetFetcher {
    /// Create a fetcher.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the identity provider's JWKS endpoint
    /// * `timeout` - Per-attempt request timeout
    /// * `max_retries` - Extra attempts after the first for retryable failures
    pub fn new(jwks_url: String, timeout: Duration, max_retries: u32) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "events.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            max_retries,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    async fn fetch_once(&self) -> Result<JwksDocument, KeySetError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        response.json::<JwksDocument>().await.map_err(|e| {
            if e.is_timeout() {
                KeySetError::Timeout
            } else {
                KeySetError::Malformed(e.to_string())
            }
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> KeySetError {
    if e.is_timeout() {
        KeySetError::Timeout
    } else {
        KeySetError::Transport(e.to_string())
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip_all, name = "events.auth.jwks.fetch")]
    async fn fetch(&self) -> Result<JwksDocument, KeySetError> {
        let mut attempt: u32 = 0;
        loop {
            tracing::debug!(target: "events.auth.jwks", url = %self.jwks_url, attempt, "Fetching JWKS");
            match self.fetch_once().await {
                Ok(document) => return Ok(document),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        target: "events.auth.jwks",
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "JWKS fetch failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => {
                    tracing::error!(target: "events.auth.jwks", error = %e, "Failed to fetch JWKS");
                    return Err(e);
                }
            }
        }
    }
}

/// Cache of the current key set.
///
/// Thread-safe; shared by handle between the verifier, the readiness probe
/// and the background refresh task.
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    current: RwLock<Option<Arc<KeySet>>>,
    /// Serializes fetches so concurrent misses trigger a single request.
    refresh_lock: Mutex<()>,
    ttl: Duration,
}

impl KeySetCache {
    /// Create an empty cache; the first lookup fetches.
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            ttl,
        }
    }

    /// Return a consistent snapshot of the current key set, fetching it if
    /// the cache is empty or older than the TTL.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError` if a needed fetch fails.
    pub async fn snapshot(&self) -> Result<Arc<KeySet>, KeySetError> {
        if let Some(key_set) = self.fresh_snapshot().await {
            tracing::debug!(target: "events.auth.jwks", "JWKS cache hit");
            return Ok(key_set);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(key_set) = self.fresh_snapshot().await {
            return Ok(key_set);
        }
        self.fetch_and_swap().await
    }

    /// Look up a key by ID in the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError` if the key set cannot be obtained. A missing key
    /// is `Ok(None)`.
    pub async fn get_key(&self, kid: &str) -> Result<Option<SigningKey>, KeySetError> {
        let key_set = self.snapshot().await?;
        Ok(key_set.get(kid).cloned())
    }

    /// Fetch a new key set regardless of the cached one's age.
    ///
    /// On failure the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError` if the fetch fails.
    pub async fn force_refresh(&self) -> Result<Arc<KeySet>, KeySetError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_swap().await
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fresh_snapshot(&self) -> Option<Arc<KeySet>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|key_set| key_set.age() < self.ttl)
            .map(Arc::clone)
    }

    #[instrument(skip_all, name = "events.auth.jwks.refresh")]
    async fn fetch_and_swap(&self) -> Result<Arc<KeySet>, KeySetError> {
        let start = Instant::now();
        let result = self.fetcher.fetch().await;
        record_jwks_fetch(if result.is_ok() { "success" } else { "error" }, start.elapsed());

        let key_set = Arc::new(KeySet::from_keys(result?.keys));
        tracing::info!(
            target: "events.auth.jwks",
            key_count = key_set.len(),
            "JWKS cache refreshed"
        );

        *self.current.write().await = Some(Arc::clone(&key_set));
        Ok(key_set)
    }
}
