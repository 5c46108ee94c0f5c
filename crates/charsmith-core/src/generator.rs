//! Schema-validated generation with bounded retry.
//!
//! ```text
//! CharacterRequest ──► Prompt::compose ──► TextGenerator::generate ─┐
//!                                                                   │ attempt
//!      ┌── strip code fences ◄──────────────────────────────────────┘
//!      ▼
//!   parse JSON ──► SchemaDescriptor::validate ──► fixed values match ──► Generated
//!      │ error            │ violation                  │ mismatch
//!      └──────────────────┴────────────────────────────┴──► next attempt (until max_attempts)
//! ```

use crate::error::{CharsmithError, Result};
use crate::prompt::{CharacterRequest, Defaults, Prompt};
use crate::schema::{character_schema, SchemaDescriptor, SchemaViolation};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

/// The external text-generation service: one prompt in, one text out.
///
/// Implementations block until the service answers or fails. Any error is
/// treated as a failed attempt by [`Generator`].
pub trait TextGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &Prompt) -> Result<String> {
        (**self).generate(prompt)
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// At least one attempt is always made.
    pub fn new(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
        }
    }

    /// Fixed pause between attempts. None follows the last attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

// ---------------------------------------------------------------------------
// Attempt outcomes
// ---------------------------------------------------------------------------

/// Why a single attempt did not produce a document.
#[derive(Debug)]
pub enum AttemptFailure {
    Service(String),
    Parse(serde_json::Error),
    Schema(SchemaViolation),
    /// A value the prompt fixed came back different.
    FixedValue {
        field: &'static str,
        expected: Value,
        found: Value,
    },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Service(e) => write!(f, "service error: {e}"),
            AttemptFailure::Parse(e) => write!(f, "response is not valid JSON: {e}"),
            AttemptFailure::Schema(v) => write!(f, "schema violation: {v}"),
            AttemptFailure::FixedValue {
                field,
                expected,
                found,
            } => write!(f, "'{field}' must be {expected}, found {found}"),
        }
    }
}

/// A document that passed validation.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Service output with code fences removed.
    pub raw: String,
    pub document: Value,
    /// 1-based number of the attempt that succeeded.
    pub attempts: u32,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct Generator<G> {
    service: G,
    policy: RetryPolicy,
    schema: &'static SchemaDescriptor,
}

impl<G: TextGenerator> Generator<G> {
    pub fn new(service: G, policy: RetryPolicy) -> Self {
        Generator {
            service,
            policy,
            schema: character_schema(),
        }
    }

    pub fn with_schema(mut self, schema: &'static SchemaDescriptor) -> Self {
        self.schema = schema;
        self
    }

    /// Generate a character document, retrying until one validates or
    /// `max_attempts` calls have been made.
    pub fn generate(&self, request: &CharacterRequest, defaults: &Defaults) -> Result<Generated> {
        let prompt = Prompt::compose(request, defaults, self.schema);
        let max = self.policy.max_attempts();
        let mut last_failure = None;

        for attempt in 1..=max {
            tracing::debug!(attempt, max_attempts = max, name = %request.name, "requesting character");
            match self.attempt(&prompt, request, defaults) {
                Ok((raw, document)) => {
                    tracing::info!(attempt, max_attempts = max, "character validated");
                    return Ok(Generated {
                        raw,
                        document,
                        attempts: attempt,
                    });
                }
                Err(failure) => {
                    tracing::warn!(attempt, max_attempts = max, "attempt failed: {failure}");
                    last_failure = Some(failure);
                }
            }
            if attempt < max && !self.policy.delay().is_zero() {
                std::thread::sleep(self.policy.delay());
            }
        }

        Err(CharsmithError::GenerationExhausted {
            attempts: max,
            last_failure: last_failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }

    fn attempt(
        &self,
        prompt: &Prompt,
        request: &CharacterRequest,
        defaults: &Defaults,
    ) -> std::result::Result<(String, Value), AttemptFailure> {
        let output = self
            .service
            .generate(prompt)
            .map_err(|e| AttemptFailure::Service(e.to_string()))?;
        let raw = strip_code_fences(&output).to_string();
        let document: Value = serde_json::from_str(&raw).map_err(AttemptFailure::Parse)?;
        self.schema
            .validate(&document)
            .map_err(AttemptFailure::Schema)?;
        check_fixed_values(&document, request, defaults)?;
        Ok((raw, document))
    }
}

/// The values `Prompt::compose` tells the service to copy verbatim.
fn check_fixed_values(
    document: &Value,
    request: &CharacterRequest,
    defaults: &Defaults,
) -> std::result::Result<(), AttemptFailure> {
    let fixed = [
        ("name", "/name", Value::from(request.name.as_str())),
        ("clients", "/clients", Value::from(request.clients.clone())),
        ("modelProvider", "/modelProvider", Value::from(request.model_provider.as_str())),
        (
            "imageModelProvider",
            "/imageModelProvider",
            Value::from(defaults.image_model_provider.as_str()),
        ),
        (
            "settings.voice.model",
            "/settings/voice/model",
            Value::from(defaults.voice_model.as_str()),
        ),
    ];
    for (field, pointer, expected) in fixed {
        let found = document.pointer(pointer).cloned().unwrap_or(Value::Null);
        if found != expected {
            return Err(AttemptFailure::FixedValue {
                field,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
