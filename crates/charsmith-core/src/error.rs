use thiserror::Error;

use crate::schema::SchemaViolation;

#[derive(Debug, Error)]
pub enum CharsmithError {
    #[error("invalid clients argument: {0}; expected a JSON array such as '[\"telegram\", \"discord\"]'")]
    InvalidClients(String),

    #[error("invalid client tokens argument: {0}; expected a JSON object such as '{{\"telegram\": \"<token>\"}}'")]
    InvalidClientTokens(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("failed to generate a valid character after {attempts} attempt(s); last failure: {last_failure}")]
    GenerationExhausted { attempts: u32, last_failure: String },

    #[error("failed to write {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("required tool '{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("command failed ({command}): {reason}")]
    CommandFailed { command: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlRead(#[from] toml::de::Error),

    #[error(transparent)]
    TomlWrite(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, CharsmithError>;
