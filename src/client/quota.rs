//! Client-side advisory quota
//!
//! Mirrors the server limiter with a longer window (15 requests per 6 hours)
//! keyed by the device fingerprint. It only shapes the user experience; the
//! server-side limiter is the enforcement point.

use super::fingerprint::DeviceFingerprint;
use crate::error::Result;
use crate::rate_limit::{LimiterSnapshot, RateLimitPolicy, SlidingWindowLimiter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const FINGERPRINT_FILE: &str = "fingerprint";
const QUOTA_FILE: &str = "quota.json";

/// On-disk form of the quota state
#[derive(Debug, Default, Serialize, Deserialize)]
struct QuotaFile {
    #[serde(default)]
    timestamps: LimiterSnapshot,
}

/// Current standing of the device against its quota
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub used: usize,
    pub remaining: usize,
    pub limited: bool,
    pub reset_in: Duration,
}

pub struct AdvisoryQuota {
    fingerprint: DeviceFingerprint,
    limiter: SlidingWindowLimiter,
    path: PathBuf,
}

impl AdvisoryQuota {
    /// Default state directory under the user's local data dir
    pub fn default_state_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectio")
    }

    /// Load fingerprint and quota state from `state_dir`
    pub fn open(state_dir: &Path) -> Result<Self> {
        let fingerprint = DeviceFingerprint::load_or_create(&state_dir.join(FINGERPRINT_FILE))?;
        let path = state_dir.join(QUOTA_FILE);

        let stored = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<QuotaFile>(&contents).unwrap_or_else(|e| {
                warn!("Ignoring unreadable quota file {}: {}", path.display(), e);
                QuotaFile::default()
            }),
            Err(_) => QuotaFile::default(),
        };
        debug!("Loaded advisory quota state for {}", fingerprint);

        Ok(Self {
            fingerprint,
            limiter: SlidingWindowLimiter::from_snapshot(
                RateLimitPolicy::advisory(),
                stored.timestamps,
            ),
            path,
        })
    }

    pub fn fingerprint(&self) -> &DeviceFingerprint {
        &self.fingerprint
    }

    pub async fn status(&self) -> QuotaStatus {
        self.status_at(Utc::now()).await
    }

    pub async fn status_at(&self, now: DateTime<Utc>) -> QuotaStatus {
        let id = self.fingerprint.as_str();
        let used = self.limiter.count_at(id, now).await;
        let remaining = self.limiter.remaining_at(id, now).await;
        QuotaStatus {
            used,
            remaining,
            limited: remaining == 0,
            reset_in: self.limiter.time_until_reset_at(id, now).await,
        }
    }

    /// Count one request and persist the state
    pub async fn record(&self) -> Result<()> {
        self.record_at(Utc::now()).await
    }

    pub async fn record_at(&self, now: DateTime<Utc>) -> Result<()> {
        self.limiter.record_at(self.fingerprint.as_str(), now).await;
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let file = QuotaFile {
            timestamps: self.limiter.snapshot().await,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}
