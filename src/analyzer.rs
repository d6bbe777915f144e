//! Request orchestration for passage analysis
//!
//! One call to [`Analyzer::handle`] walks a request through the pipeline:
//!
//! ```text
//! method -> body -> rate limit -> cache -> credential -> prompt -> model
//!        -> extract -> JSON validation -> cache write -> response
//! ```
//!
//! Every stage either advances or returns a [`LectioError`]; nothing escapes
//! as a panic or a raw upstream error. Cache hits do not count against the
//! rate limit: only requests that reach the model are recorded.

use crate::cache::AnalysisCache;
use crate::error::{LectioError, Result};
use crate::extract::extract;
use crate::prompt::{build_prompt, GenerationConfig};
use crate::rate_limit::RateLimiter;
use crate::services::LlmBackend;
use crate::types::{AnalysisRequest, AnalysisResult, CacheStatus};
use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest excerpt of an unparseable response returned to the client
pub const EXCERPT_LIMIT: usize = 200;

/// Successful analysis and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub cache_status: CacheStatus,
}

/// Request orchestrator
#[derive(Clone)]
pub struct Analyzer {
    cache: Arc<dyn AnalysisCache>,
    limiter: Arc<dyn RateLimiter>,
    /// `None` when no credential is configured
    backend: Option<Arc<dyn LlmBackend>>,
    generation: GenerationConfig,
}

impl Analyzer {
    pub fn new(
        cache: Arc<dyn AnalysisCache>,
        limiter: Arc<dyn RateLimiter>,
        backend: Option<Arc<dyn LlmBackend>>,
    ) -> Self {
        Self {
            cache,
            limiter,
            backend,
            generation: GenerationConfig::ANALYSIS,
        }
    }

    pub fn cache(&self) -> &Arc<dyn AnalysisCache> {
        &self.cache
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Run one request through the pipeline
    pub async fn handle(&self, method: &Method, client_id: &str, body: &[u8]) -> Result<Analysis> {
        if *method != Method::POST {
            return Err(LectioError::MethodNotAllowed(method.to_string()));
        }

        let request = parse_request(body)?;
        if request.stream {
            debug!("Streaming requested; responding without streaming");
        }

        if self.limiter.is_limited(client_id).await {
            let reset_in = self.limiter.time_until_reset(client_id).await;
            warn!("Rate limit exceeded for {} (resets in {:?})", client_id, reset_in);
            return Err(LectioError::RateLimited { reset_in });
        }

        if let Some(result) = self.cache.get(&request.text).await {
            info!("Cache hit ({} words)", result.words().len());
            return Ok(Analysis {
                result,
                cache_status: CacheStatus::Hit,
            });
        }

        let backend = self.backend.as_ref().ok_or(LectioError::MissingCredential)?;

        self.limiter.record(client_id).await;

        let prompt = build_prompt(&request.text);
        debug!("Invoking model ({} prompt chars)", prompt.len());
        let raw = backend.generate(&prompt, &self.generation).await.map_err(|e| {
            warn!("Model invocation failed: {}", e);
            e
        })?;

        let result = parse_analysis(&raw)?;
        self.cache.set(&request.text, result.clone()).await;

        info!("Analysis complete ({} words)", result.words().len());
        Ok(Analysis {
            result,
            cache_status: CacheStatus::Miss,
        })
    }
}

/// Decode the request body and require non-empty text
pub fn parse_request(body: &[u8]) -> Result<AnalysisRequest> {
    let request: AnalysisRequest = serde_json::from_slice(body)
        .map_err(|e| LectioError::InvalidRequest(format!("Request body must be JSON: {}", e)))?;

    if request.text.trim().is_empty() {
        return Err(LectioError::InvalidRequest("Text is required".to_string()));
    }
    Ok(request)
}

/// Extract the model's JSON and check its shape
///
/// Only the outer shape is validated: an object with a `words` array. The
/// object itself is kept exactly as the model produced it.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult> {
    let candidate = extract(raw);
    let parsed = serde_json::from_str::<Value>(&candidate)
        .map_err(|e| e.to_string())
        .and_then(|value| AnalysisResult::from_value(value).map_err(str::to_string));

    parsed.map_err(|message| {
        warn!("Model response is not a valid analysis: {}", message);
        LectioError::Parsing {
            message,
            excerpt: excerpt(&candidate),
        }
    })
}

/// First [`EXCERPT_LIMIT`] characters of `text`
pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LIMIT).collect()
}
