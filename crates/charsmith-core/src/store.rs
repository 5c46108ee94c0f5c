//! Persistence of validated character documents.
//!
//! One document in, one file out. Writes go through a tempfile in the
//! destination directory and are renamed into place, so a reader never sees
//! a half-written file and an existing file is replaced wholesale.

use crate::error::{CharsmithError, Result};
use crate::schema::character_schema;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize with 4-space indentation and no trailing newline.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| CharsmithError::InvalidInput(e.to_string()))
}

/// Atomically write `data` to `path`, creating parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let persist_err = |reason: String| CharsmithError::Persist {
        path: path.display().to_string(),
        reason,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| persist_err(e.to_string()))?;
    tmp.write_all(data).map_err(|e| persist_err(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| persist_err(e.error.to_string()))?;
    Ok(())
}

/// Write a character document to `path`, replacing any existing file.
///
/// The document must already satisfy the schema; this is checked again so
/// an invalid document can never reach disk.
pub fn save_character(path: &Path, document: &Value) -> Result<()> {
    character_schema().validate(document)?;
    let mut text = to_pretty_json(document)?;
    text.push('\n');
    atomic_write(path, text.as_bytes())?;
    tracing::info!(path = %path.display(), "character saved");
    Ok(())
}

/// Read a JSON file. Schema validation is left to the caller.
pub fn load_character(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(CharsmithError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
