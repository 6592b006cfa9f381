//! Error types module
//!
//! All client-side failures are unified under [`AppError`]. The taxonomy follows
//! where a failure originates:
//!
//! - [`AppError::Validation`]: rejected locally, before any network call
//! - [`AppError::Request`]: the server answered with a non-2xx status
//! - [`AppError::Transport`] / [`AppError::Decode`]: the request never produced a usable response
//! - [`AppError::Unknown`]: anything else, shown with a generic message

use std::io;

/// Generic message shown for failures that carry no usable text.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a failed request
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "REQUEST_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same action may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Message rendered next to the form field or in the error slot
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Form slot an error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    /// The video URL input
    Url,
    /// The title tag input
    Title,
    /// The slug (output file name) input
    Slug,
    /// Form-level slot used for submission results
    Result,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Url => "url",
            FormField::Title => "title",
            FormField::Slug => "slug",
            FormField::Result => "result",
        }
    }
}

/// Client-side validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("URL is invalid")]
    InvalidUrl,

    #[error("Find the video before submitting")]
    NoPreview,

    #[error("Title is required")]
    MissingTitle,

    #[error("Slug is required")]
    MissingSlug,
}

impl ValidationError {
    /// Form field the error is rendered against.
    pub fn field(&self) -> FormField {
        match self {
            ValidationError::InvalidUrl | ValidationError::NoPreview => FormField::Url,
            ValidationError::MissingTitle => FormField::Title,
            ValidationError::MissingSlug => FormField::Slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response payload: {0}")]
    Decode(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Unknown(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Correct the highlighted field and try again"),
            LogLevel::Debug,
        ),
        AppError::Request { status, .. } if *status >= 500 => (
            "REQUEST_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
        AppError::Request { .. } => (
            "REQUEST_ERROR",
            false,
            Some("Check the request and try again"),
            LogLevel::Warn,
        ),
        AppError::Transport(_) => (
            "TRANSPORT_ERROR",
            true,
            Some("Check that the server is reachable"),
            LogLevel::Warn,
        ),
        AppError::Decode(_) => (
            "DECODE_ERROR",
            false,
            Some("Check client and server versions"),
            LogLevel::Error,
        ),
        AppError::Unknown(_) => ("UNKNOWN_ERROR", true, None, LogLevel::Error),
    }
}

impl AppError {
    /// Build a request error from a status code and the message extracted from the body.
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        AppError::Request {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the response, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(err) => err.to_string(),
            AppError::Request { message, .. } if !message.trim().is_empty() => message.clone(),
            AppError::Request { .. } => UNKNOWN_ERROR_MESSAGE.to_string(),
            AppError::Transport(_) => "Could not reach the server".to_string(),
            AppError::Decode(_) => "Unexpected response from the server".to_string(),
            AppError::Unknown(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}
