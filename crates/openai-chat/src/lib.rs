//! `openai-chat`: a small blocking client for the chat-completions API.
//!
//! It speaks exactly one shape of request: a model, a system instruction and
//! a user instruction in; the first choice's text out. Each call is a single
//! HTTP round trip bounded by a per-request timeout. Retrying is the
//! caller's business.
//!
//! ```text
//! ChatRequest ──► ChatClient::create ──► POST {api_base}/chat/completions
//!                        │
//!                        ▼
//!                 ChatCompletion ──► first_text()
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use openai_chat::{ChatClient, ClientOptions};
//!
//! let client = ChatClient::new(api_key, ClientOptions::default())?;
//! let text = client.complete("gpt-4o", "You are terse.", "Say hello.")?;
//! ```

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{ChatClient, ClientOptions, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use error::ChatError;
pub use types::{ChatCompletion, ChatMessage, ChatRequest, Choice, Role, Usage};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ChatError>;
