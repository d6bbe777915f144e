//! Error taxonomy and client-facing error bodies
//!
//! Upstream failures arrive as free text (and sometimes an HTTP status). They
//! are folded into a closed set of error kinds, each with a status code,
//! retry guidance, and a short list of suggestions for the user.

use crate::error::LectioError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Closed set of error kinds reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    RateLimitError,
    AuthenticationError,
    TimeoutError,
    ParsingError,
    UnknownError,
    /// Anything that escaped the more specific handlers
    GeneralError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::RateLimitError => "rate_limit_error",
            ErrorType::AuthenticationError => "authentication_error",
            ErrorType::TimeoutError => "timeout_error",
            ErrorType::ParsingError => "parsing_error",
            ErrorType::UnknownError => "unknown_error",
            ErrorType::GeneralError => "general_error",
        }
    }

    /// Only transient failures are worth re-issuing
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorType::RateLimitError | ErrorType::TimeoutError)
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying an upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status_code: StatusCode,
    pub error_type: ErrorType,
    pub retryable: bool,
}

impl Classification {
    fn of(status_code: StatusCode, error_type: ErrorType) -> Self {
        Self {
            status_code,
            error_type,
            retryable: error_type.is_retryable(),
        }
    }

    pub fn rate_limit() -> Self {
        Self::of(StatusCode::TOO_MANY_REQUESTS, ErrorType::RateLimitError)
    }

    pub fn authentication() -> Self {
        Self::of(StatusCode::UNAUTHORIZED, ErrorType::AuthenticationError)
    }

    pub fn timeout() -> Self {
        Self::of(StatusCode::GATEWAY_TIMEOUT, ErrorType::TimeoutError)
    }

    pub fn unknown() -> Self {
        Self::of(StatusCode::INTERNAL_SERVER_ERROR, ErrorType::UnknownError)
    }
}

/// Classify a failure of the model invocation
///
/// A structured upstream status wins when it is one we recognize; otherwise
/// the message text decides.
pub fn classify(err: &LectioError) -> Classification {
    match err {
        LectioError::UpstreamApi { status, message } => status
            .and_then(classify_status)
            .unwrap_or_else(|| classify_message(message)),
        LectioError::Http(e) if e.is_timeout() => Classification::timeout(),
        // Transport failures carry no upstream message worth matching
        LectioError::Http(_) => Classification::unknown(),
        LectioError::DeadlineExceeded(_) => Classification::timeout(),
        other => classify_message(&other.to_string()),
    }
}

/// Map a recognized upstream HTTP status
pub fn classify_status(status: u16) -> Option<Classification> {
    match status {
        429 => Some(Classification::rate_limit()),
        401 | 403 => Some(Classification::authentication()),
        408 | 504 => Some(Classification::timeout()),
        _ => None,
    }
}

/// Substring heuristic over the lowercased message
pub fn classify_message(message: &str) -> Classification {
    let message = message.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));

    if mentions(&["rate limit", "quota"]) {
        Classification::rate_limit()
    } else if mentions(&["authentication", "auth", "key"]) {
        Classification::authentication()
    } else if mentions(&["timeout", "deadline"]) {
        Classification::timeout()
    } else {
        Classification::unknown()
    }
}

/// Plain-language next steps for an error kind
pub fn suggestions(error_type: ErrorType) -> Vec<String> {
    let lines: &[&str] = match error_type {
        ErrorType::RateLimitError => &[
            "Wait a minute before sending another passage",
            "Analyze shorter passages to use fewer requests",
            "Repeated passages are served from cache and do not count against the limit",
        ],
        ErrorType::AuthenticationError => &[
            "The analysis service credential is missing or invalid",
            "Contact the site operator to verify the API key configuration",
        ],
        ErrorType::TimeoutError => &[
            "Try again in a few moments",
            "Shorten the passage so the analysis completes faster",
        ],
        ErrorType::ParsingError => &[
            "Try the request again; the model occasionally returns malformed output",
            "Shorten or simplify the passage",
            "Report the passage if the problem persists",
        ],
        ErrorType::UnknownError | ErrorType::GeneralError => &[
            "Try again later",
            "Check that the passage is Latin text",
            "Report the problem if it keeps happening",
        ],
    };
    lines.iter().map(|line| line.to_string()).collect()
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub error_type: ErrorType,
    pub retryable: bool,
    pub suggestions: Vec<String>,
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_in_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_in_seconds: Option<u64>,
    /// Bounded excerpt of an unparseable model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_excerpt: Option<String>,
}

impl ErrorResponse {
    /// Body with suggestions and retry flag derived from `error_type`
    pub fn new(error: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            error: error.into(),
            details: None,
            error_type,
            retryable: error_type.is_retryable(),
            suggestions: suggestions(error_type),
            fallback: false,
            reset_in_ms: None,
            reset_in_seconds: None,
            raw_excerpt: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    pub fn with_reset(mut self, reset_in: std::time::Duration) -> Self {
        self.reset_in_ms = Some(reset_in.as_millis() as u64);
        self.reset_in_seconds = Some(whole_seconds(reset_in));
        self
    }

    pub fn with_raw_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.raw_excerpt = Some(excerpt.into());
        self
    }
}

/// Seconds rounded up, for `Retry-After`
pub fn whole_seconds(duration: std::time::Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
