use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::types::{ApiErrorEnvelope, ChatCompletion, ChatRequest};
use crate::{ChatError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest slice of a response body quoted in an error.
const BODY_EXCERPT: usize = 500;

// ─── ClientOptions ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL up to and including the version segment, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    /// Deadline for one request, connect through body.
    pub timeout: Duration,
    /// Sent as `OpenAI-Organization` when set.
    pub organization: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            organization: None,
        }
    }
}

// ─── ChatClient ───────────────────────────────────────────────────────────

/// One blocking `POST /chat/completions` per call. No retries at this layer.
pub struct ChatClient {
    http: Client,
    api_key: String,
    options: ClientOptions,
}

impl ChatClient {
    pub fn new(api_key: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ChatError::Config("API key is empty".into()));
        }
        if options.timeout.is_zero() {
            return Err(ChatError::Config("timeout must be greater than zero".into()));
        }
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;
        Ok(ChatClient {
            http,
            api_key,
            options,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.options.api_base.trim_end_matches('/'))
    }

    /// Send `request` and decode the completion.
    pub fn create(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let url = self.endpoint();
        tracing::debug!(url = %url, model = %request.model, "sending chat completion");

        let mut builder = self.http.post(&url).bearer_auth(&self.api_key).json(request);
        if let Some(org) = &self.options.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().map_err(|e| self.transport_error(&url, e))?;
        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(&url, e))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited(error_message(&body)));
        }
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let completion: ChatCompletion =
            serde_json::from_str(&body).map_err(|source| ChatError::Decode {
                body: excerpt(&body),
                source,
            })?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion usage"
            );
        }
        Ok(completion)
    }

    /// Send a system + user prompt and return the first choice's text.
    pub fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let completion = self.create(&ChatRequest::new(model, system, user))?;
        completion
            .first_text()
            .map(str::to_owned)
            .ok_or(ChatError::EmptyResponse)
    }

    fn transport_error(&self, url: &str, source: reqwest::Error) -> ChatError {
        if source.is_timeout() {
            ChatError::Timeout(self.options.timeout)
        } else {
            ChatError::Connection {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Prefer the API's own error message; fall back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => excerpt(body),
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
