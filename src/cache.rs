//! Process-lifetime cache of analysis results
//!
//! Keys are the exact request text; there is no normalization, expiry, or
//! eviction. Entries live until the process exits.

use crate::types::AnalysisResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for previously produced analyses
///
/// The orchestrator only talks to this trait, so the in-memory map can be
/// replaced by a shared external store without touching the pipeline.
#[async_trait]
pub trait AnalysisCache: Send + Sync {
    /// Check whether an analysis exists for `text`
    async fn has(&self, text: &str) -> bool;

    /// Fetch the analysis stored for `text`
    async fn get(&self, text: &str) -> Option<AnalysisResult>;

    /// Store `result` under `text`, replacing any previous entry
    async fn set(&self, text: &str, result: AnalysisResult);

    /// Number of stored entries
    async fn entry_count(&self) -> usize;
}

/// Unbounded in-memory cache
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, AnalysisResult>>>,
}

impl InMemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisCache for InMemoryCache {
    async fn has(&self, text: &str) -> bool {
        let entries = self.entries.read().await;
        entries.contains_key(text)
    }

    async fn get(&self, text: &str) -> Option<AnalysisResult> {
        let entries = self.entries.read().await;
        entries.get(text).cloned()
    }

    async fn set(&self, text: &str, result: AnalysisResult) {
        let mut entries = self.entries.write().await;
        entries.insert(text.to_string(), result);
        debug!("Cached analysis ({} entries)", entries.len());
    }

    async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
