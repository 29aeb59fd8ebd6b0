//! # Error Handling
//!
//! This module defines custom error types and how they're converted to HTTP responses.
//!
//! ## Error Categories:
//! - **Input**: The client sent no audio (or malformed multipart data) → 400
//! - **NotFound**: A requested synthesized audio file doesn't exist → 404
//! - **Transcode**: The external ffmpeg conversion failed → 502
//! - **ExternalService**: A speech/language backend was unreachable or errored → 502
//! - **ConfigError**: Configuration file or environment variable problems → 500
//! - **Internal**: Everything else server-side (file I/O, lock poisoning, etc.) → 500
//!
//! ## Degradation policy:
//! Most stage failures *after* an upload was accepted never reach this module:
//! the pipeline substitutes marker/fallback values (sentinel transcript, apology
//! feedback, empty audio reference) and still returns 200 so the interview loop
//! stays alive. Only transcode failures and local I/O failures abort the request,
//! because nothing downstream is meaningful without a usable waveform.

use actix_web::{HttpResponse, ResponseError};  // Web framework error handling
use serde_json::json;                          // For creating JSON error responses
use std::fmt;                                  // For implementing Display trait

/// Custom error types for the application.
///
/// Each variant carries a human-readable message that ends up in the JSON
/// `error` field of the response.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid audio upload
    Input(String),

    /// Requested resource (synthesized audio file) was not found
    NotFound(String),

    /// The ffmpeg subprocess failed; message carries exit status and stderr tail
    Transcode(String),

    /// A speech-to-text, generation, or synthesis backend failed in a way the
    /// pipeline could not degrade around
    ExternalService(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// Internal server errors (temp-file I/O, poisoned locks, etc.)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Input(msg) => write!(f, "Input error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Transcode(msg) => write!(f, "Transcode error: {}", msg),
            AppError::ExternalService(msg) => write!(f, "External service error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts our custom errors into HTTP responses.
///
/// ## JSON Response Format:
/// All errors return JSON with a top-level `error` field (the shape the
/// browser client checks for):
/// ```json
/// {
///   "error": "No audio file provided",
///   "kind": "input_error",
///   "timestamp": "2025-01-01T12:00:00Z"
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, kind, message) = match self {
            AppError::Input(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "input_error",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::Transcode(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "transcode_error",
                msg.clone(),
            ),
            AppError::ExternalService(msg) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": message,
            "kind": kind,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Temp-file reads/writes and work-directory creation are the only direct I/O
/// the request path performs; all of it is server-side.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

/// reqwest errors reaching this conversion are transport-level failures that
/// escaped the pipeline's per-stage degradation.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>` used across handlers and the pipeline.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            AppError::Input("no audio".to_string()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("gone".to_string()).error_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Transcode("ffmpeg exited 1".to_string()).error_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Internal("oops".to_string()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_includes_message() {
        let err = AppError::ExternalService("speech API unreachable".to_string());
        assert!(err.to_string().contains("speech API unreachable"));
    }
}
