//! Command-line client for the analysis endpoint
//!
//! Provides:
//! - Device fingerprinting for the advisory quota
//! - The advisory quota itself (checked before every request)
//! - An HTTP client that decodes success and error bodies

pub mod fingerprint;
pub mod quota;

pub use fingerprint::DeviceFingerprint;
pub use quota::{AdvisoryQuota, QuotaStatus};

use crate::classify::ErrorResponse;
use crate::error::{LectioError, Result};
use crate::types::{AnalysisRequest, AnalysisResult};
use tracing::debug;

/// Default endpoint for a locally running server
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/analyze";

/// Decoded response from the endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeResponse {
    Success {
        result: AnalysisResult,
        /// `X-Cache` header value, when present
        cache_status: Option<String>,
    },
    Failed {
        status: u16,
        error: ErrorResponse,
    },
}

pub struct AnalysisClient {
    endpoint: String,
    client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Submit `text` for analysis
    pub async fn analyze(&self, text: &str) -> Result<AnalyzeResponse> {
        debug!("Posting passage to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalysisRequest {
                text: text.to_string(),
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        let cache_status = response
            .headers()
            .get("x-cache")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if status.is_success() {
            let result = serde_json::from_str(&body)?;
            return Ok(AnalyzeResponse::Success {
                result,
                cache_status,
            });
        }

        let error = serde_json::from_str::<ErrorResponse>(&body).map_err(|_| {
            LectioError::Other(format!(
                "Server returned status {} with an unexpected body",
                status
            ))
        })?;
        Ok(AnalyzeResponse::Failed {
            status: status.as_u16(),
            error,
        })
    }
}
