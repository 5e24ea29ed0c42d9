//! Plumbing shared by engines that talk to HTTP backends.

use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::EngineError;

/// Non-success response from an engine backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("authentication rejected ({0})")]
    Unauthorized(StatusCode),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl HttpError {
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(status),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            _ => Self::Status { status, body },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(status) | Self::Status { status, .. } => *status,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// Pass 2xx responses through; anything else becomes an [`HttpError`] carrying the body.
pub async fn ensure_success(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::from_status(status, body))
}

/// `{base}/chat/completions` for an OpenAI-compatible base url.
pub fn chat_completions_url(base: &str) -> String {
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

pub fn client(timeout: Duration) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EngineError::Setup(e.to_string()))
}
