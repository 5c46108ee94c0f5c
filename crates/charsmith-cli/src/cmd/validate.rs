use crate::output::print_json;
use anyhow::Context;
use charsmith_core::schema::character_schema;
use charsmith_core::store::load_character;
use std::path::Path;

/// `file` is taken relative to the working directory, like any other shell path.
pub fn run(file: &Path, json: bool) -> anyhow::Result<()> {
    let path = std::env::current_dir()
        .context("cannot determine working directory")?
        .join(file);
    let value = load_character(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let result = character_schema().validate(&value);

    if json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "valid": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        }))?;
    } else if result.is_ok() {
        println!("{}: valid", path.display());
    }

    result.with_context(|| format!("{} does not match the character schema", path.display()))?;
    Ok(())
}
