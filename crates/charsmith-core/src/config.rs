use crate::error::Result;
use crate::generator::RetryPolicy;
use crate::paths;
use crate::prompt::Defaults;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_attempts() -> u32 {
    RetryPolicy::DEFAULT_MAX_ATTEMPTS
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

impl GenerationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts).with_delay(Duration::from_millis(self.retry_delay_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory (relative to the root) of the agent runtime checkout.
    #[serde(default = "default_agent_repo")]
    pub agent_repo: String,
}

fn default_agent_repo() -> String {
    "agent".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            agent_repo: default_agent_repo(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeployConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_region")]
    pub primary_region: String,
    #[serde(default = "default_internal_port")]
    pub internal_port: u16,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default = "default_cpu_kind")]
    pub cpu_kind: String,
    #[serde(default = "default_cpus")]
    pub cpus: u32,
    #[serde(default = "default_flyctl")]
    pub flyctl: String,
}

fn default_region() -> String {
    "sjc".to_string()
}

fn default_internal_port() -> u16 {
    3000
}

fn default_memory() -> String {
    "2gb".to_string()
}

fn default_cpu_kind() -> String {
    "shared".to_string()
}

fn default_cpus() -> u32 {
    2
}

fn default_flyctl() -> String {
    "flyctl".to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            primary_region: default_region(),
            internal_port: default_internal_port(),
            memory: default_memory(),
            cpu_kind: default_cpu_kind(),
            cpus: default_cpus(),
            flyctl: default_flyctl(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Contents of `charsmith.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

impl Config {
    /// Load `<root>/charsmith.yaml`, or the defaults when it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::store::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    /// Check for values that load fine but will misbehave at run time.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.generation.model.trim().is_empty() {
            push(WarnLevel::Error, "generation.model is empty".to_string());
        }
        if self.generation.max_attempts == 0 {
            push(
                WarnLevel::Warning,
                "generation.max_attempts is 0; one attempt will still be made".to_string(),
            );
        }
        if self.generation.timeout_secs == 0 {
            push(
                WarnLevel::Error,
                "generation.timeout_secs is 0; every request would time out immediately"
                    .to_string(),
            );
        }
        if !self.generation.api_base.starts_with("http://")
            && !self.generation.api_base.starts_with("https://")
        {
            push(
                WarnLevel::Error,
                format!(
                    "generation.api_base '{}' is not an http(s) URL",
                    self.generation.api_base
                ),
            );
        }
        if self.defaults.voice_model.trim().is_empty() {
            push(WarnLevel::Warning, "defaults.voice_model is empty".to_string());
        }
        if let Err(e) = paths::validate_path_component("output.agent_repo", &self.output.agent_repo)
        {
            push(WarnLevel::Error, e.to_string());
        }
        if self.deploy.cpus == 0 {
            push(WarnLevel::Error, "deploy.cpus must be at least 1".to_string());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.generation.model, "gpt-4o");
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.defaults.voice_model, "en_US-female-medium");
        assert_eq!(config.defaults.image_model_provider, "falai");
        assert_eq!(config.output.agent_repo, "agent");
        assert_eq!(config.deploy.primary_region, "sjc");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("charsmith.yaml"),
            "generation:\n  max_attempts: 5\n  retry_delay_ms: 250\ndeploy:\n  primary_region: ams\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.generation.max_attempts, 5);
        assert_eq!(config.generation.model, "gpt-4o");
        assert_eq!(config.deploy.primary_region, "ams");
        assert_eq!(config.deploy.internal_port, 3000);

        let policy = config.generation.retry_policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_millis(250));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.agent_repo = "eliza".into();
        config.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.output.agent_repo, "eliza");
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut config = Config::default();
        config.generation.max_attempts = 0;
        config.generation.timeout_secs = 0;
        config.generation.api_base = "api.openai.com".into();
        config.output.agent_repo = "../elsewhere".into();
        let warnings = config.validate();
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Warning)
                .count(),
            1
        );
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            3
        );
    }
}
