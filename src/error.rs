//! # Error Handling
//!
//! This module defines the application error type and how it is converted to HTTP responses.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - **Purpose**: Forces you to handle both success and failure cases
//! - **No exceptions**: A failing transcript provider returns `Err(ProviderError)`,
//!   which the `?` operator turns into an `AppError::Provider`
//!
//! ### Traits for Error Conversion
//! - **From trait**: Automatically converts between error types
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted as strings (used in logs)
//!
//! ## Wire format:
//! Every error response body has exactly one attribute:
//! ```json
//! { "error": "No video ID provided" }
//! ```

use crate::transcript::ProviderError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **BadRequest**: Client sent invalid data (400)
/// - **MethodNotAllowed**: Endpoint called with the wrong HTTP verb (405)
/// - **Provider**: The transcript provider failed (500, message passed through verbatim)
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::BadRequest("No video ID provided".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Client sent invalid or incomplete data
    BadRequest(String),

    /// Wrong HTTP method for the resource
    MethodNotAllowed(String),

    /// Listing, selecting or fetching a transcript failed
    Provider(String),
}

impl AppError {
    /// The message sent to the client, without the category prefix used by `Display`.
    pub fn message(&self) -> &str {
        match self {
            AppError::BadRequest(msg)
            | AppError::MethodNotAllowed(msg)
            | AppError::Provider(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::MethodNotAllowed(msg) => write!(f, "Method not allowed: {}", msg),
            AppError::Provider(msg) => write!(f, "Transcript provider error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Implementation of the ResponseError trait for AppError.
///
/// ## HTTP Status Code Mapping:
/// - BadRequest → 400 (Bad Request)
/// - MethodNotAllowed → 405 (Method Not Allowed)
/// - Provider → 500 (Internal Server Error)
///
/// actix-web calls `status_code()` for logging and `error_response()` to build the reply
/// whenever a handler returns `Err(AppError)`.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.message(),
        })
    }
}

/// Provider failures keep their own wording; clients see exactly what the provider reported.
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Provider(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
