use crate::error::{CharsmithError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "charsmith.yaml";
pub const CHARACTERS_DIR: &str = "characters";
pub const USERS_DIR: &str = "users";
pub const CHARACTER_SUFFIX: &str = ".character.json";
pub const FLY_TOML: &str = "fly.toml";

/// Where the agent image keeps character files once deployed.
pub const DEPLOYED_APP_DIR: &str = "/app";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn agent_repo_dir(root: &Path, agent_repo: &str) -> PathBuf {
    root.join(agent_repo)
}

pub fn character_file_name(agent_name: &str) -> String {
    format!("{agent_name}{CHARACTER_SUFFIX}")
}

/// `<root>/<agent_repo>/characters[/<username>]/<agent>.character.json`
pub fn character_file(
    root: &Path,
    agent_repo: &str,
    username: Option<&str>,
    agent_name: &str,
) -> PathBuf {
    let mut dir = agent_repo_dir(root, agent_repo).join(CHARACTERS_DIR);
    if let Some(user) = username {
        dir = dir.join(user);
    }
    dir.join(character_file_name(agent_name))
}

pub fn user_dir(root: &Path, username: &str) -> PathBuf {
    root.join(USERS_DIR).join(username)
}

pub fn fly_toml_path(root: &Path, username: &str) -> PathBuf {
    user_dir(root, username).join(FLY_TOML)
}

/// Character file path relative to the agent repo, as passed to the image build.
pub fn build_character_file(username: &str, agent_name: &str) -> String {
    format!(
        "{CHARACTERS_DIR}/{username}/{}",
        character_file_name(agent_name)
    )
}

/// Absolute character file path inside the deployed agent container.
pub fn deployed_character_file(username: &str, agent_name: &str) -> String {
    format!(
        "{DEPLOYED_APP_DIR}/{}",
        build_character_file(username, agent_name)
    )
}

// ---------------------------------------------------------------------------
// Identifier validation
// ---------------------------------------------------------------------------

/// Reject identifiers that would escape their directory when joined into a path.
pub fn validate_path_component(kind: &str, value: &str) -> Result<()> {
    let bad = value.trim().is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
        || value.contains('\0');
    if bad {
        return Err(CharsmithError::InvalidInput(format!(
            "{kind} '{value}' cannot be used as a file name"
        )));
    }
    Ok(())
}

static APP_COMPONENT_RE: OnceLock<Regex> = OnceLock::new();

fn app_component_re() -> &'static Regex {
    APP_COMPONENT_RE.get_or_init(|| Regex::new(r"[^a-z0-9-]").unwrap())
}

/// Lowercase and replace anything outside `[a-z0-9-]` with `-`.
pub fn sanitize_app_component(input: &str) -> String {
    app_component_re()
        .replace_all(&input.to_lowercase(), "-")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
