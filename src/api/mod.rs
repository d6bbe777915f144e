//! HTTP API for passage analysis
//!
//! Provides:
//! - `POST /api/analyze` running the analysis pipeline
//! - `GET /api/debug` reporting configuration presence flags
//! - `GET /health`

pub mod errors;
pub mod server;

pub use errors::{error_response, ApiError};
pub use server::{build_router, client_id, ApiServer, AppState, FORWARDED_FOR, X_CACHE};
