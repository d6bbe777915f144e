//! Error conversion from LectioError to HTTP responses
//!
//! Locally detected conditions map to fixed status codes. Model invocation
//! failures go through the classifier. Anything else is a `general_error`.

use crate::classify::{classify, whole_seconds, ErrorResponse, ErrorType};
use crate::error::LectioError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use tracing::error;

/// Response wrapper for pipeline errors
#[derive(Debug)]
pub struct ApiError(pub LectioError);

impl From<LectioError> for ApiError {
    fn from(err: LectioError) -> Self {
        ApiError(err)
    }
}

/// Status code and body for an error
pub fn error_response(err: &LectioError) -> (StatusCode, ErrorResponse) {
    match err {
        LectioError::MethodNotAllowed(method) => (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorResponse::new("Method not allowed", ErrorType::GeneralError)
                .with_details(format!("Use POST instead of {}", method)),
        ),
        LectioError::InvalidRequest(message) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(message.clone(), ErrorType::GeneralError),
        ),
        LectioError::RateLimited { reset_in } => (
            StatusCode::TOO_MANY_REQUESTS,
            ErrorResponse::new("Too many requests", ErrorType::RateLimitError)
                .with_details(format!(
                    "Rate limit exceeded. Try again in {} seconds.",
                    whole_seconds(*reset_in)
                ))
                .with_reset(*reset_in),
        ),
        LectioError::MissingCredential => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("API key not configured", ErrorType::UnknownError)
                .with_details("The analysis service is missing its model credential")
                .with_fallback(),
        ),
        LectioError::Parsing { message, excerpt } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new("Failed to parse analysis", ErrorType::ParsingError)
                .with_details(message.clone())
                .with_raw_excerpt(excerpt.clone())
                .with_fallback(),
        ),
        LectioError::UpstreamApi { .. }
        | LectioError::Http(_)
        | LectioError::DeadlineExceeded(_) => {
            let classification = classify(err);
            let title = match classification.error_type {
                ErrorType::RateLimitError => "Analysis service rate limit reached",
                ErrorType::AuthenticationError => "Analysis service authentication failed",
                ErrorType::TimeoutError => "Analysis timed out",
                _ => "Analysis service error",
            };
            (
                classification.status_code,
                ErrorResponse::new(title, classification.error_type).with_details(upstream_details(err)),
            )
        }
        LectioError::Config(_)
        | LectioError::Io(_)
        | LectioError::Serialization(_)
        | LectioError::Other(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("Internal server error", ErrorType::GeneralError),
        ),
    }
}

/// Client-safe description of a model invocation failure
fn upstream_details(err: &LectioError) -> String {
    match err {
        LectioError::Http(e) if e.is_timeout() => {
            "The analysis service did not respond in time".to_string()
        }
        LectioError::Http(e) if e.is_connect() => {
            "Could not connect to the analysis service".to_string()
        }
        LectioError::Http(_) => "Request to the analysis service failed".to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = error_response(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        match &self.0 {
            LectioError::RateLimited { reset_in } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(whole_seconds(*reset_in)));
            }
            LectioError::MethodNotAllowed(_) => {
                headers.insert(header::ALLOW, HeaderValue::from_static("POST"));
            }
            _ => {}
        }
        response
    }
}

/// Body for a panic caught at the router boundary
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", message);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error", ErrorType::GeneralError)),
    )
        .into_response()
}
