use crate::errors::{AppError, Result};
use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use chrono::Utc;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for a fixed-window rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Length of the fixed window
    pub window: Duration,
    /// Maximum requests admitted per key per window
    pub max_requests: u64,
    /// Status code returned on denial
    pub status_code: StatusCode,
    /// Human-readable denial message
    pub message: String,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_requests: 100,
            status_code: StatusCode::TOO_MANY_REQUESTS,
            message: "Too many requests, please try again later".to_string(),
        }
    }
}

impl RateLimiterConfig {
    fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(AppError::Configuration(
                "Rate limit window must be positive".to_string(),
            ));
        }
        if self.max_requests == 0 {
            return Err(AppError::Configuration(
                "Rate limit quota must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request descriptor the limiter and its hooks can inspect
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

/// Pluggable key derivation and bypass strategy.
///
/// Both hooks may suspend (e.g. perform a lookup) and may fail; a
/// failure propagates out of [`RateLimiter::check`] unchanged.
#[async_trait]
pub trait KeyPolicy: Send + Sync {
    /// Derive the quota key for a request
    async fn key(&self, req: &RequestInfo) -> Result<String>;

    /// Whether this request bypasses rate limiting entirely
    async fn skip(&self, _req: &RequestInfo) -> Result<bool> {
        Ok(false)
    }
}

/// Default policy: key on the client network address
pub struct RemoteAddrPolicy;

#[async_trait]
impl KeyPolicy for RemoteAddrPolicy {
    async fn key(&self, req: &RequestInfo) -> Result<String> {
        Ok(req
            .remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()))
    }
}

/// Observability hook fired on every denial. Its failure is logged and
/// never affects the decision.
pub type OnLimitReached = Arc<dyn Fn(&RequestInfo, &str) -> Result<()> + Send + Sync>;

/// Quota status reported with every non-exempt decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds, rounded up) when the window resets
    pub reset_epoch_secs: i64,
}

/// Outcome of a rate limit check
#[derive(Debug, Clone)]
pub enum RateLimitDecision {
    /// The skip hook fired; no counters touched, no quota headers
    Exempt,
    Allowed(QuotaStatus),
    Denied {
        quota: QuotaStatus,
        retry_after_secs: i64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            RateLimitDecision::Exempt | RateLimitDecision::Allowed(_)
        )
    }
}

/// Per-key counting record
#[derive(Debug)]
struct CounterRecord {
    count: u64,
    /// Epoch milliseconds at which the window ends
    reset_at: i64,
}

/// Fixed-window rate limiter.
///
/// Owns a key -> counter store and a background sweep task that evicts
/// expired records every window. The read-branch-increment-compare
/// sequence for a key runs under a single map entry guard, so
/// concurrent checks for the same key cannot lose updates; checks for
/// distinct keys do not serialize behind one another.
pub struct RateLimiter {
    config: RateLimiterConfig,
    policy: Arc<dyn KeyPolicy>,
    on_limit_reached: Option<OnLimitReached>,
    store: Arc<DashMap<String, CounterRecord>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter keyed on the client address, with no hooks
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        Self::with_hooks(config, Arc::new(RemoteAddrPolicy), None)
    }

    /// Create a limiter with a custom key policy and optional denial hook
    pub fn with_hooks(
        config: RateLimiterConfig,
        policy: Arc<dyn KeyPolicy>,
        on_limit_reached: Option<OnLimitReached>,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(DashMap::new());
        let sweeper = spawn_sweeper(store.clone(), config.window);

        Ok(Self {
            config,
            policy,
            on_limit_reached,
            store,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Decide whether a request is within quota for its key's current
    /// window, updating the per-key counter.
    ///
    /// Exactly `max_requests` requests per key per window are allowed;
    /// the increment that crosses the threshold is the one denied. A
    /// request landing exactly at the window boundary still counts
    /// against the old window.
    pub async fn check(&self, req: &RequestInfo) -> Result<RateLimitDecision> {
        if self.policy.skip(req).await? {
            return Ok(RateLimitDecision::Exempt);
        }

        let key = self.policy.key(req).await?;
        let now = Utc::now().timestamp_millis();
        let window_ms = self.config.window.as_millis() as i64;

        // Read, branch on expiry, increment, and snapshot under one
        // entry guard. The guard must be dropped before any user
        // callback runs.
        let (count, reset_at) = {
            let mut record = self.store.entry(key.clone()).or_insert(CounterRecord {
                count: 0,
                reset_at: now + window_ms,
            });
            if now > record.reset_at {
                record.count = 0;
                record.reset_at = now + window_ms;
            }
            record.count += 1;
            (record.count, record.reset_at)
        };

        let limit = self.config.max_requests;
        let reset_epoch_secs = ceil_secs(reset_at);

        if count > limit {
            tracing::debug!(key = %key, count, limit, "rate limit exceeded");

            if let Some(callback) = &self.on_limit_reached {
                if let Err(e) = callback(req, &key) {
                    tracing::warn!(key = %key, error = %e, "on_limit_reached callback failed");
                }
            }

            return Ok(RateLimitDecision::Denied {
                quota: QuotaStatus {
                    limit,
                    remaining: 0,
                    reset_epoch_secs,
                },
                retry_after_secs: ceil_secs(reset_at - now).max(0),
            });
        }

        Ok(RateLimitDecision::Allowed(QuotaStatus {
            limit,
            remaining: limit - count,
            reset_epoch_secs,
        }))
    }

    /// Delete the record for `key`; its next request starts a new window
    pub fn reset(&self, key: &str) {
        self.store.remove(key);
    }

    /// Clear every record
    pub fn reset_all(&self) {
        self.store.clear();
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// Stop the background sweep and clear the store. Idempotent; the
    /// sweep does not fire again after this returns.
    pub fn destroy(&self) {
        if let Some(handle) = self.sweeper.lock().ok().and_then(|mut guard| guard.take()) {
            handle.abort();
        }
        self.store.clear();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Periodic eviction of expired records, bounding memory growth from
/// keys the request path never revisits.
fn spawn_sweeper(store: Arc<DashMap<String, CounterRecord>>, window: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let now = Utc::now().timestamp_millis();
            let before = store.len();
            store.retain(|_, record| now <= record.reset_at);
            let evicted = before.saturating_sub(store.len());
            if evicted > 0 {
                tracing::debug!(evicted, "swept expired rate limit records");
            }
        }
    })
}

/// Convert epoch milliseconds to seconds, rounding up
fn ceil_secs(ms: i64) -> i64 {
    ms.div_euclid(1000) + if ms.rem_euclid(1000) > 0 { 1 } else { 0 }
}
