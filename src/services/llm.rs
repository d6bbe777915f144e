//! LLM service for Latin analysis
//!
//! Provides integration with the Gemini `generateContent` REST method. The
//! service sends one prompt, receives one text blob, and reports failures
//! as-is: there is no retry loop and no client-side timeout.

use crate::error::{LectioError, Result};
use crate::prompt::GenerationConfig;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send `prompt` and return the model's text output
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;
}

/// Configuration for the Gemini backend
#[derive(Debug)]
pub struct LlmConfig {
    /// Gemini API key
    pub api_key: SecretString,

    /// Model to use (default: gemini-1.5-flash)
    pub model: String,

    /// API base URL, overridable for proxies and tests
    pub base_url: String,
}

impl LlmConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// Gemini-backed generation service
pub struct GeminiBackend {
    config: LlmConfig,
    client: reqwest::Client,
}

/// generateContent request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// generateContent response format
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiBackend {
    /// Create a new backend with custom config
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(LectioError::MissingCredential);
        }

        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        debug!("Calling Gemini API (model: {})", self.config.model);

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: config,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Gemini API request failed with status {}", status);
            return Err(upstream_error(status.as_u16(), &error_text));
        }

        let body: GenerateResponse = response.json().await.map_err(reqwest::Error::without_url)?;
        collect_text(body)
    }
}

/// Turn a non-success response into an upstream error, keeping the API's
/// own message when the body is the documented error envelope
fn upstream_error(status: u16, body: &str) -> LectioError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) if body.trim().is_empty() => format!("API request failed with status {}", status),
        Err(_) => format!("API request failed with status {}: {}", status, body.trim()),
    };

    LectioError::UpstreamApi {
        status: Some(status),
        message,
    }
}

/// Concatenate the text parts of the first candidate
fn collect_text(body: GenerateResponse) -> Result<String> {
    let parts = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let text: String = parts.into_iter().map(|part| part.text).collect();
    if text.is_empty() {
        return Err(LectioError::UpstreamApi {
            status: None,
            message: "Empty response from model".to_string(),
        });
    }
    Ok(text)
}
