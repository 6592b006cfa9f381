//! Error logging at the level each error kind asks for.

use ytmp3_core::{AppError, ErrorMetadata, LogLevel};

pub fn log_error(error: &AppError, context: &str) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code = code, "{}", context);
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code = code, "{}", context);
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code = code, "{}", context);
        }
    }
}
