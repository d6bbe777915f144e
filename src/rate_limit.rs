//! Sliding-window request limiting
//!
//! Two policies share the same limiter: the server-side guard (10 requests per
//! minute per forwarded client address) and the client-side advisory quota
//! (15 requests per 6 hours per device fingerprint). Each instance keeps its
//! own state; nothing is coordinated across processes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared bucket for requests without a client identity
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Window size and cap for a limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Trailing window over which requests are counted
    pub window: Duration,
    /// Requests allowed within one window
    pub max_requests: usize,
}

impl RateLimitPolicy {
    /// Server-side abuse guard: 10 requests per 60 seconds
    pub fn server() -> Self {
        Self {
            window: Duration::seconds(60),
            max_requests: 10,
        }
    }

    /// Client-side advisory quota: 15 requests per 6 hours
    pub fn advisory() -> Self {
        Self {
            window: Duration::hours(6),
            max_requests: 15,
        }
    }
}

/// Per-client request throttling
///
/// Kept narrow so the in-process limiter can be swapped for an external
/// shared store.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// True when the client has used its whole window allowance
    async fn is_limited(&self, client_id: &str) -> bool;

    /// Count one request for the client at the current time
    async fn record(&self, client_id: &str);

    /// Time until the oldest in-window request expires (zero if none)
    async fn time_until_reset(&self, client_id: &str) -> std::time::Duration;
}

/// Serializable view of limiter state
pub type LimiterSnapshot = HashMap<String, Vec<DateTime<Utc>>>;

/// In-memory sliding-window limiter
///
/// `record` only appends; stale timestamps are pruned by the next read of the
/// same client.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    policy: RateLimitPolicy,
    records: Arc<Mutex<LimiterSnapshot>>,
}

impl SlidingWindowLimiter {
    /// Create an empty limiter
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::from_snapshot(policy, LimiterSnapshot::new())
    }

    /// Create a limiter seeded with previously persisted timestamps
    pub fn from_snapshot(policy: RateLimitPolicy, snapshot: LimiterSnapshot) -> Self {
        Self {
            policy,
            records: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Copy of the current state, for persistence
    pub async fn snapshot(&self) -> LimiterSnapshot {
        self.records.lock().await.clone()
    }

    pub async fn is_limited_at(&self, client_id: &str, now: DateTime<Utc>) -> bool {
        self.count_at(client_id, now).await >= self.policy.max_requests
    }

    pub async fn record_at(&self, client_id: &str, now: DateTime<Utc>) {
        let mut records = self.records.lock().await;
        records.entry(client_id.to_string()).or_default().push(now);
    }

    /// Requests counted for the client inside the window ending at `now`
    pub async fn count_at(&self, client_id: &str, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().await;
        prune(&mut records, client_id, now - self.policy.window)
            .map(|stamps| stamps.len())
            .unwrap_or(0)
    }

    /// Requests still allowed for the client inside the window ending at `now`
    pub async fn remaining_at(&self, client_id: &str, now: DateTime<Utc>) -> usize {
        self.policy
            .max_requests
            .saturating_sub(self.count_at(client_id, now).await)
    }

    pub async fn time_until_reset_at(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> std::time::Duration {
        let mut records = self.records.lock().await;
        let oldest = prune(&mut records, client_id, now - self.policy.window)
            .and_then(|stamps| stamps.iter().min().copied());

        match oldest {
            Some(oldest) => (oldest + self.policy.window - now)
                .to_std()
                .unwrap_or_default(),
            None => std::time::Duration::ZERO,
        }
    }
}

/// Drop timestamps at or before `cutoff`; returns what is left for the client
fn prune<'a>(
    records: &'a mut LimiterSnapshot,
    client_id: &str,
    cutoff: DateTime<Utc>,
) -> Option<&'a Vec<DateTime<Utc>>> {
    let emptied = match records.get_mut(client_id) {
        Some(stamps) => {
            let before = stamps.len();
            stamps.retain(|stamp| *stamp > cutoff);
            if stamps.len() != before {
                debug!(
                    "Pruned {} expired timestamps for {}",
                    before - stamps.len(),
                    client_id
                );
            }
            stamps.is_empty()
        }
        None => return None,
    };

    if emptied {
        records.remove(client_id);
        return None;
    }
    records.get(client_id)
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn is_limited(&self, client_id: &str) -> bool {
        self.is_limited_at(client_id, Utc::now()).await
    }

    async fn record(&self, client_id: &str) {
        self.record_at(client_id, Utc::now()).await
    }

    async fn time_until_reset(&self, client_id: &str) -> std::time::Duration {
        self.time_until_reset_at(client_id, Utc::now()).await
    }
}
