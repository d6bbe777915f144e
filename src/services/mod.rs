//! Services layer for Lectio
//!
//! Provides the generative model integration used by the analyzer.

pub mod llm;

pub use llm::{GeminiBackend, LlmBackend, LlmConfig, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
