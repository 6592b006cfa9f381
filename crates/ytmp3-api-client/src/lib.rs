//! HTTP client for the ytmp3 conversion API.
//!
//! Provides a thin fetch wrapper ([`ApiClient::call`]) that resolves paths
//! against a fixed base address and normalizes non-2xx responses into
//! [`AppError::Request`] carrying the server-supplied message, plus domain
//! methods (list tasks, preview a video, create a task, download output).

pub mod api;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use ytmp3_core::{AppError, AppResult, ClientConfig};

pub use api::VideoApi;

/// Caller-supplied request options, merged into the request built by [`ApiClient::call`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    /// JSON body; sets `Content-Type: application/json`
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// POST with a JSON body.
    pub fn post_json<B: serde::Serialize>(body: &B) -> AppResult<Self> {
        Ok(Self {
            method: Method::POST,
            body: Some(serde_json::to_value(body)?),
            ..Self::default()
        })
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    message: Option<serde_json::Value>,
}

/// Extract the human-readable message from a non-2xx response body.
///
/// Uses the JSON `message` field when present and a string; otherwise the
/// status text. Never fails.
pub fn error_message_from_body(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .and_then(|message| message.as_str().map(str::to_string))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| status_text(status))
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

fn map_transport_error(err: reqwest::Error) -> AppError {
    if err.is_decode() {
        AppError::Decode(err.to_string())
    } else {
        AppError::Transport(err.to_string())
    }
}

/// HTTP client for the ytmp3 API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Unknown(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> AppResult<Self> {
        Self::new(config.api_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the response once its status is 2xx.
    pub async fn send(&self, path: &str, options: RequestOptions) -> AppResult<Response> {
        let url = self.build_url(path);
        let method = options.method.clone();
        let mut request = self.client.request(options.method, &url);

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, method = %method, path = %path, "Request could not be sent");
            map_transport_error(e)
        })?;

        let status = response.status();
        tracing::debug!(method = %method, path = %path, status = status.as_u16(), "API response");

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = error_message_from_body(status, &body);
            tracing::warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                message = %message,
                "API request failed"
            );
            return Err(AppError::request(status.as_u16(), message));
        }

        Ok(response)
    }

    /// Send a request and decode the JSON response.
    pub async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> AppResult<T> {
        let response = self.send(path, options).await?;
        let body = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, path = %path, "Failed to parse response as JSON");
            AppError::Decode(e.to_string())
        })
    }
}
