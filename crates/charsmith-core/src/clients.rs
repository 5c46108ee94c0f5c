//! Parsing of integration-channel arguments.
//!
//! Generation takes a plain list of channel names. Deployment takes a map of
//! channel name to credential; credentials never enter a generated document.

use crate::error::{CharsmithError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parse a JSON array of channel names, e.g. `["telegram", "discord"]`.
pub fn parse_client_list(raw: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CharsmithError::InvalidClients(format!("'{raw}' is not valid JSON ({e})")))?;
    let Value::Array(items) = value else {
        return Err(CharsmithError::InvalidClients(format!(
            "'{raw}' is not a JSON array"
        )));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s),
            other => Err(CharsmithError::InvalidClients(format!(
                "channel names must be non-empty strings, found {other}"
            ))),
        })
        .collect()
}

/// Parse a JSON object of channel name to credential, e.g. `{"telegram": "123:abc"}`.
pub fn parse_client_tokens(raw: &str) -> Result<BTreeMap<String, String>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        CharsmithError::InvalidClientTokens(format!("'{}' is not valid JSON ({e})", redact(raw)))
    })?;
    let Value::Object(map) = value else {
        return Err(CharsmithError::InvalidClientTokens(
            "value is not a JSON object".to_string(),
        ));
    };
    map.into_iter()
        .map(|(channel, token)| match token {
            Value::String(t) => Ok((channel, t)),
            _ => Err(CharsmithError::InvalidClientTokens(format!(
                "credential for '{channel}' must be a string"
            ))),
        })
        .collect()
}

// The raw argument may hold credentials; only its length is safe to echo.
fn redact(raw: &str) -> String {
    format!("<{} bytes>", raw.len())
}
