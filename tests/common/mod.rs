//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use lectio_core::{
    build_router, Analyzer, AppState, GenerationConfig, InMemoryCache, LectioError, LlmBackend,
    RateLimitPolicy, SlidingWindowLimiter,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const GALLIA: &str = "Gallia est omnis divisa in partes tres";

/// Model output: one fenced JSON object with a single word
pub const FENCED_GALLIA: &str = r#"Here is the analysis you asked for:
```json
{
  "words": [
    {
      "word": "Gallia",
      "partOfSpeech": "noun",
      "lemma": "Gallia",
      "meaning": {"short": "Gaul", "detailed": "The region of Gaul"},
      "morphology": {"case": "nominative", "number": "singular", "gender": "feminine"},
      "relationships": [{"type": "subject", "targetIndex": 1, "description": "subject of est", "direction": "from"}],
      "relatedWords": {"synonyms": [], "derivedForms": ["Gallicus"], "usageExamples": []},
      "position": {"sentenceIndex": 0, "wordIndex": 0}
    }
  ],
  "sentences": [{"text": "Gallia est omnis divisa in partes tres", "translation": "All Gaul is divided into three parts"}]
}
```"#;

/// Canned reply of a stub backend
#[derive(Clone)]
pub enum StubReply {
    Text(String),
    Upstream { status: Option<u16>, message: String },
    /// Never answers
    Hang,
}

/// Backend that returns a fixed reply and counts invocations
pub struct StubBackend {
    reply: StubReply,
    calls: AtomicUsize,
}

impl StubBackend {
    pub fn new(reply: StubReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn text(text: &str) -> Arc<Self> {
        Self::new(StubReply::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for StubBackend {
    async fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> lectio_core::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            StubReply::Text(text) => Ok(text.clone()),
            StubReply::Upstream { status, message } => Err(LectioError::UpstreamApi {
                status: *status,
                message: message.clone(),
            }),
            StubReply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Router wired to `backend` with the server-side rate limit
pub fn test_app(backend: Option<Arc<StubBackend>>) -> Router {
    test_app_with_timeout(backend, Duration::from_secs(30))
}

pub fn test_app_with_timeout(backend: Option<Arc<StubBackend>>, timeout: Duration) -> Router {
    let analyzer = Analyzer::new(
        Arc::new(InMemoryCache::new()),
        Arc::new(SlidingWindowLimiter::new(RateLimitPolicy::server())),
        backend.map(|b| b as Arc<dyn LlmBackend>),
    );
    build_router(AppState::new(analyzer, timeout))
}

/// POST a JSON body to the analysis endpoint
pub fn analyze_request(body: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json");
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn text_body(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}

/// Collect a response body as JSON
pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
