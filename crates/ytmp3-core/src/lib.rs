//! ytmp3 Core Library
//!
//! Domain models, error types, configuration and input validation shared by
//! the API client, the client workflows and the command-line front end.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{ClientConfig, PollConfig, DEFAULT_API_URL};
pub use error::{
    AppError, ErrorMetadata, FormField, LogLevel, ValidationError, UNKNOWN_ERROR_MESSAGE,
};
pub use models::{
    file_url, has_pending, CreateTaskBody, DownloadKind, DownloadLink, TagFields, Task,
    TaskStatus, VideoPreview,
};
pub use validation::{slugify, validate_video_url};

pub type AppResult<T> = Result<T, AppError>;
