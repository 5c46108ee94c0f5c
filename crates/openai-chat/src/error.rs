use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("the server could not be reached ({url}): {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("received status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {source}\n  body: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response contained no message content")]
    EmptyResponse,
}

impl ChatError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ChatError::Connection { .. } | ChatError::Timeout(_) | ChatError::RateLimited(_) => {
                true
            }
            ChatError::Status { status, .. } => *status >= 500,
            ChatError::Decode { .. } | ChatError::EmptyResponse => true,
            ChatError::Config(_) => false,
        }
    }
}
