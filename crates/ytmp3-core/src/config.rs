//! Configuration module
//!
//! Client configuration is read from the environment (and a `.env` file when
//! present). Every value has a default so the client works against a local
//! server out of the box.

use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const POLL_INTERVAL_MS: u64 = 1000;
const POLL_MAX_BACKOFF_MS: u64 = 30_000;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Settings for the task list polling loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before re-fetching while a task is pending
    pub interval: Duration,
    /// Upper bound for the delay after consecutive failed fetches
    pub max_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(POLL_INTERVAL_MS),
            max_backoff: Duration::from_millis(POLL_MAX_BACKOFF_MS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base address; every endpoint path is appended to it
    pub api_url: String,
    pub request_timeout: Duration,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            poll: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_url = env::var("YTMP3_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let interval_ms: u64 = env::var("YTMP3_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("YTMP3_POLL_INTERVAL_MS must be a valid number"))?;

        let max_backoff_ms: u64 = env::var("YTMP3_POLL_MAX_BACKOFF_MS")
            .unwrap_or_else(|_| POLL_MAX_BACKOFF_MS.to_string())
            .parse()
            .unwrap_or(POLL_MAX_BACKOFF_MS);

        let timeout_secs: u64 = env::var("YTMP3_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .unwrap_or(REQUEST_TIMEOUT_SECS);

        let config = Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(timeout_secs),
            poll: PollConfig {
                interval: Duration::from_millis(interval_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the API base address (e.g. from a command-line flag).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "YTMP3_API_URL must be an http:// or https:// address, got '{}'",
                self.api_url
            ));
        }

        if self.poll.interval.is_zero() {
            return Err(anyhow::anyhow!(
                "YTMP3_POLL_INTERVAL_MS must be greater than zero"
            ));
        }

        if self.poll.max_backoff < self.poll.interval {
            return Err(anyhow::anyhow!(
                "YTMP3_POLL_MAX_BACKOFF_MS must not be smaller than the poll interval"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.interval, Duration::from_millis(1000));
        assert_eq!(config.api_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_with_api_url_trims_trailing_slash() {
        let config = ClientConfig::default().with_api_url(" https://music.example.com/api/ ");
        assert_eq!(config.api_url, "https://music.example.com/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_base() {
        let config = ClientConfig::default().with_api_url("/api");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ClientConfig::default();
        config.poll.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_backoff_below_interval() {
        let mut config = ClientConfig::default();
        config.poll.max_backoff = Duration::from_millis(10);
        assert!(config.validate().is_err());
    }
}
