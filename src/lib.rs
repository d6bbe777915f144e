//! Lectio - Latin passage analysis service
//!
//! Accepts a Latin passage over HTTP, asks a generative language model for a
//! grammatical breakdown, and returns per-word morphology, lemmas,
//! relationships, and translations.
//!
//! # Architecture
//!
//! The request pipeline is built from small, independently testable parts:
//! - **Cache**: process-lifetime map from exact passage text to its analysis
//! - **Rate limiting**: sliding-window counters per client
//! - **Extraction**: recovery of JSON from free-form model output
//! - **Classification**: mapping of upstream failures to client error kinds
//! - **Analyzer**: the orchestrator sequencing all of the above
//! - **API**: axum router exposing the analyzer
//!
//! # Example
//!
//! ```ignore
//! use lectio_core::{ApiServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     ApiServer::new(config)?.serve().await
//! }
//! ```

pub mod analyzer;
pub mod api;
pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod rate_limit;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use analyzer::{Analysis, Analyzer};
pub use api::{build_router, ApiServer, AppState};
pub use cache::{AnalysisCache, InMemoryCache};
pub use classify::{classify, suggestions, Classification, ErrorResponse, ErrorType};
pub use config::ServerConfig;
pub use error::{LectioError, Result};
pub use extract::extract;
pub use prompt::GenerationConfig;
pub use rate_limit::{RateLimitPolicy, RateLimiter, SlidingWindowLimiter};
pub use services::{GeminiBackend, LlmBackend, LlmConfig};
pub use types::{
    AnalysisRequest, AnalysisResult, CacheStatus, Morphology, Relationship, SentenceInfo,
    WordAnalysis,
};
