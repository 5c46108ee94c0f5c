//! Fly.io deployment glue: `fly.toml` rendering and the `flyctl` call sequence.
//!
//! A deployment is a fixed, linear plan:
//!
//! 1. `flyctl apps create <app> --org <org>`
//! 2. `flyctl secrets set KEY=VALUE -a <app>` once per secret
//! 3. `flyctl deploy --config <fly.toml> -a <app>` from the agent repo
//!
//! Execution stops at the first step that exits non-zero. Secret values are
//! passed to the child process but never logged or displayed.

use crate::config::DeployConfig;
use crate::error::{CharsmithError, Result};
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// App naming
// ---------------------------------------------------------------------------

/// `<user>-<agent>-<UTC timestamp digits>`, e.g. `alice-ava-20261018093000123`.
pub fn app_name(username: &str, agent_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        paths::sanitize_app_component(username),
        paths::sanitize_app_component(agent_name),
        now.format("%Y%m%d%H%M%S%3f")
    )
}

// ---------------------------------------------------------------------------
// fly.toml
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyToml {
    pub app: String,
    pub primary_region: String,
    pub build: BuildSection,
    pub http_service: HttpService,
    #[serde(default)]
    pub vm: Vec<VmSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSection {
    pub args: BuildArgs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildArgs {
    #[serde(rename = "CHAR_FILE")]
    pub char_file: String,
    #[serde(rename = "CHAR_DEST")]
    pub char_dest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpService {
    pub internal_port: u16,
    pub force_https: bool,
    pub auto_stop_machines: bool,
    pub auto_start_machines: bool,
    pub min_machines_running: u32,
    pub processes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSpec {
    pub memory: String,
    pub cpu_kind: String,
    pub cpus: u32,
}

impl FlyToml {
    pub fn new(username: &str, agent_name: &str, app: &str, config: &DeployConfig) -> Self {
        FlyToml {
            app: app.to_string(),
            primary_region: config.primary_region.clone(),
            build: BuildSection {
                args: BuildArgs {
                    char_file: paths::build_character_file(username, agent_name),
                    char_dest: format!("./{}/{username}/", paths::CHARACTERS_DIR),
                },
            },
            http_service: HttpService {
                internal_port: config.internal_port,
                force_https: true,
                auto_stop_machines: false,
                auto_start_machines: true,
                min_machines_running: 1,
                processes: vec!["app".to_string()],
            },
            vm: vec![VmSpec {
                memory: config.memory.clone(),
                cpu_kind: config.cpu_kind.clone(),
                cpus: config.cpus,
            }],
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Write `<root>/users/<username>/fly.toml` and return its path.
pub fn write_fly_toml(
    root: &Path,
    username: &str,
    agent_name: &str,
    app: &str,
    config: &DeployConfig,
) -> Result<PathBuf> {
    paths::validate_path_component("username", username)?;
    paths::validate_path_component("agent name", agent_name)?;
    let path = paths::fly_toml_path(root, username);
    let content = FlyToml::new(username, agent_name, app, config).to_toml()?;
    crate::store::atomic_write(&path, content.as_bytes())?;
    tracing::info!(path = %path.display(), app, "fly.toml written");
    Ok(path)
}

/// Read the `app` name out of an existing fly.toml.
pub fn read_app_name(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(CharsmithError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)?;
    let app = table
        .get("app")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();
    if app.is_empty() {
        return Err(CharsmithError::InvalidInput(format!(
            "no app name in {}",
            path.display()
        )));
    }
    Ok(app.to_string())
}

// ---------------------------------------------------------------------------
// Deploy request → plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub agent_repo: String,
    pub username: String,
    pub agent_name: String,
    pub organization: String,
    /// Provider identifier the agent runs against (`openai`, `anthropic`).
    pub llm_provider: String,
    pub llm_api_key: String,
    pub fal_api_key: String,
    /// Channel name to credential, e.g. `telegram` → bot token.
    pub client_tokens: BTreeMap<String, String>,
    pub fly_access_token: String,
}

/// Environment variable that carries the provider's API key, if known.
pub fn provider_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        _ => None,
    }
}

/// Environment variable that carries a channel credential, if known.
pub fn channel_token_var(channel: &str) -> Option<&'static str> {
    match channel.to_ascii_lowercase().as_str() {
        "telegram" => Some("TELEGRAM_BOT_TOKEN"),
        "discord" => Some("DISCORD_API_TOKEN"),
        _ => None,
    }
}

/// One `flyctl` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyStep {
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Index of an argument whose value after `=` must not be displayed.
    secret_arg: Option<usize>,
}

impl FlyStep {
    fn new(args: &[&str]) -> Self {
        FlyStep {
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            secret_arg: None,
        }
    }

    /// Arguments with secret values masked.
    pub fn display_args(&self) -> Vec<String> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, arg)| match (self.secret_arg, arg.split_once('=')) {
                (Some(s), Some((key, _))) if s == i => format!("{key}=***"),
                _ => arg.clone(),
            })
            .collect()
    }
}

impl fmt::Display for FlyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_args().join(" "))
    }
}

#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub app: String,
    pub fly_toml: PathBuf,
    pub agent_repo_dir: PathBuf,
    /// Secret names in the order they are set.
    pub secret_names: Vec<String>,
    pub steps: Vec<FlyStep>,
    fly_access_token: String,
}

impl DeployPlan {
    /// Check preconditions and assemble the call sequence. Runs nothing.
    pub fn build(root: &Path, request: &DeployRequest) -> Result<Self> {
        if request.fly_access_token.trim().is_empty() {
            return Err(CharsmithError::InvalidInput(
                "Fly.io access token is missing or empty".to_string(),
            ));
        }
        if request.organization.trim().is_empty() {
            return Err(CharsmithError::InvalidInput(
                "Fly.io organization is missing or empty".to_string(),
            ));
        }
        paths::validate_path_component("agent repo", &request.agent_repo)?;
        paths::validate_path_component("username", &request.username)?;
        paths::validate_path_component("agent name", &request.agent_name)?;

        let agent_repo_dir = paths::agent_repo_dir(root, &request.agent_repo);
        if !agent_repo_dir.is_dir() {
            return Err(CharsmithError::FileNotFound(format!(
                "agent repo directory {}",
                agent_repo_dir.display()
            )));
        }
        let fly_toml = paths::fly_toml_path(root, &request.username);
        let app = read_app_name(&fly_toml)?;

        let mut secrets: Vec<(String, String)> = vec![(
            "CHARACTER_FILE".to_string(),
            paths::deployed_character_file(&request.username, &request.agent_name),
        )];
        match provider_key_var(&request.llm_provider) {
            Some(var) => secrets.push((var.to_string(), request.llm_api_key.clone())),
            None => tracing::warn!(
                provider = %request.llm_provider,
                "unknown model provider; no API key secret will be set"
            ),
        }
        secrets.push(("FAL_API_KEY".to_string(), request.fal_api_key.clone()));
        for (channel, token) in &request.client_tokens {
            match channel_token_var(channel) {
                Some(var) => secrets.push((var.to_string(), token.clone())),
                None => tracing::warn!(channel = %channel, "no secret mapping for channel; skipped"),
            }
        }

        let mut steps = vec![FlyStep::new(&[
            "apps",
            "create",
            &app,
            "--org",
            &request.organization,
        ])];
        for (key, value) in &secrets {
            let mut step = FlyStep::new(&["secrets", "set", &format!("{key}={value}"), "-a", &app]);
            step.secret_arg = Some(2);
            steps.push(step);
        }
        let fly_toml_arg = fly_toml.to_string_lossy().into_owned();
        let mut deploy = FlyStep::new(&["deploy", "--config", &fly_toml_arg, "-a", &app]);
        deploy.cwd = Some(agent_repo_dir.clone());
        steps.push(deploy);

        Ok(DeployPlan {
            app,
            fly_toml,
            agent_repo_dir,
            secret_names: secrets.into_iter().map(|(k, _)| k).collect(),
            steps,
            fly_access_token: request.fly_access_token.clone(),
        })
    }

    /// Run every step in order, stopping at the first failure.
    pub fn execute(&self, runner: &dyn CommandRunner) -> Result<()> {
        let env = [("FLY_ACCESS_TOKEN", self.fly_access_token.as_str())];
        for (i, step) in self.steps.iter().enumerate() {
            tracing::info!(step = i + 1, total = self.steps.len(), "flyctl {step}");
            runner.run(step, &env)?;
        }
        tracing::info!(app = %self.app, "deployed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

/// Runs one `flyctl` step. Replaced by a recorder in tests.
pub trait CommandRunner {
    fn run(&self, step: &FlyStep, env: &[(&str, &str)]) -> Result<()>;
}

/// Spawns the real `flyctl` binary, inheriting stdout/stderr.
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    /// Locate `program` (normally `flyctl`) on PATH.
    pub fn locate(program: &str) -> Result<Self> {
        let program = which::which(program)
            .map_err(|_| CharsmithError::ToolNotFound(program.to_string()))?;
        Ok(ProcessRunner { program })
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, step: &FlyStep, env: &[(&str, &str)]) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&step.args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &step.cwd {
            cmd.current_dir(dir);
        }
        let status = cmd.status().map_err(|e| CharsmithError::CommandFailed {
            command: format!("flyctl {step}"),
            reason: e.to_string(),
        })?;
        if !status.success() {
            return Err(CharsmithError::CommandFailed {
                command: format!("flyctl {step}"),
                reason: match status.code() {
                    Some(code) => format!("exit code {code}"),
                    None => "terminated by signal".to_string(),
                },
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(Vec<String>, Option<PathBuf>, Vec<(String, String)>)>>,
        fail_on: Option<usize>,
    }

    impl CommandRunner for Recorder {
        fn run(&self, step: &FlyStep, env: &[(&str, &str)]) -> Result<()> {
            let mut calls = self.calls.borrow_mut();
            calls.push((
                step.args.clone(),
                step.cwd.clone(),
                env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ));
            if self.fail_on == Some(calls.len()) {
                return Err(CharsmithError::CommandFailed {
                    command: step.to_string(),
                    reason: "exit code 1".into(),
                });
            }
            Ok(())
        }
    }

    fn request() -> DeployRequest {
        DeployRequest {
            agent_repo: "agent".into(),
            username: "alice".into(),
            agent_name: "Ava".into(),
            organization: "personal".into(),
            llm_provider: "openai".into(),
            llm_api_key: "sk-test".into(),
            fal_api_key: "fal-test".into(),
            client_tokens: BTreeMap::from([
                ("telegram".to_string(), "123:abc".to_string()),
                ("myspace".to_string(), "nope".to_string()),
            ]),
            fly_access_token: "fly-token".into(),
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("agent")).unwrap();
        write_fly_toml(dir.path(), "alice", "Ava", "alice-ava-1", &DeployConfig::default()).unwrap();
        dir
    }

    #[test]
    fn app_name_is_sanitized_and_timestamped() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 5).unwrap();
        assert_eq!(app_name("Alice Smith", "Ava_2", now), "alice-smith-ava-2-20261018093005000");
    }

    #[test]
    fn fly_toml_round_trips() {
        let dir = project();
        let path = paths::fly_toml_path(dir.path(), "alice");
        let parsed: FlyToml = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.app, "alice-ava-1");
        assert_eq!(parsed.primary_region, "sjc");
        assert_eq!(parsed.build.args.char_file, "characters/alice/Ava.character.json");
        assert_eq!(parsed.http_service.internal_port, 3000);
        assert_eq!(parsed.vm[0].memory, "2gb");
        assert_eq!(read_app_name(&path).unwrap(), "alice-ava-1");
    }

    #[test]
    fn read_app_name_requires_a_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fly.toml");
        std::fs::write(&path, "primary_region = \"sjc\"\n").unwrap();
        assert!(matches!(read_app_name(&path), Err(CharsmithError::InvalidInput(_))));
        assert!(matches!(
            read_app_name(&dir.path().join("missing.toml")),
            Err(CharsmithError::FileNotFound(_))
        ));
    }

    #[test]
    fn plan_orders_steps_and_maps_secrets() {
        let dir = project();
        let plan = DeployPlan::build(dir.path(), &request()).unwrap();
        assert_eq!(plan.app, "alice-ava-1");
        assert_eq!(
            plan.secret_names,
            vec!["CHARACTER_FILE", "OPENAI_API_KEY", "FAL_API_KEY", "TELEGRAM_BOT_TOKEN"]
        );
        assert_eq!(plan.steps.len(), 6);
        assert_eq!(plan.steps[0].args, vec!["apps", "create", "alice-ava-1", "--org", "personal"]);
        assert_eq!(
            plan.steps[1].args[2],
            "CHARACTER_FILE=/app/characters/alice/Ava.character.json"
        );
        let last = plan.steps.last().unwrap();
        assert_eq!(last.args[0], "deploy");
        assert_eq!(last.cwd.as_deref(), Some(dir.path().join("agent").as_path()));
    }

    #[test]
    fn anthropic_provider_uses_its_own_key() {
        let dir = project();
        let mut req = request();
        req.llm_provider = "anthropic".into();
        let plan = DeployPlan::build(dir.path(), &req).unwrap();
        assert!(plan.secret_names.contains(&"ANTHROPIC_API_KEY".to_string()));
        assert!(!plan.secret_names.contains(&"OPENAI_API_KEY".to_string()));
    }

    #[test]
    fn secret_values_are_masked_in_display() {
        let dir = project();
        let plan = DeployPlan::build(dir.path(), &request()).unwrap();
        let shown: Vec<String> = plan.steps.iter().map(|s| s.to_string()).collect();
        let joined = shown.join("\n");
        assert!(joined.contains("OPENAI_API_KEY=***"));
        assert!(!joined.contains("sk-test"));
        assert!(!joined.contains("123:abc"));
    }

    #[test]
    fn plan_preconditions() {
        let dir = project();

        let mut req = request();
        req.fly_access_token = "  ".into();
        assert!(matches!(
            DeployPlan::build(dir.path(), &req),
            Err(CharsmithError::InvalidInput(_))
        ));

        let mut req = request();
        req.agent_repo = "missing-repo".into();
        assert!(matches!(
            DeployPlan::build(dir.path(), &req),
            Err(CharsmithError::FileNotFound(_))
        ));

        let mut req = request();
        req.username = "bob".into();
        assert!(matches!(
            DeployPlan::build(dir.path(), &req),
            Err(CharsmithError::FileNotFound(_))
        ));
    }

    #[test]
    fn execute_passes_token_and_stops_on_failure() {
        let dir = project();
        let plan = DeployPlan::build(dir.path(), &request()).unwrap();

        let ok = Recorder::default();
        plan.execute(&ok).unwrap();
        let calls = ok.calls.borrow();
        assert_eq!(calls.len(), plan.steps.len());
        assert!(calls
            .iter()
            .all(|(_, _, env)| env == &vec![("FLY_ACCESS_TOKEN".to_string(), "fly-token".to_string())]));

        let failing = Recorder {
            fail_on: Some(2),
            ..Default::default()
        };
        let err = plan.execute(&failing).unwrap_err();
        assert!(matches!(err, CharsmithError::CommandFailed { .. }));
        assert_eq!(failing.calls.borrow().len(), 2);
    }

    #[test]
    fn locate_missing_tool() {
        assert!(matches!(
            ProcessRunner::locate("definitely-not-a-real-flyctl-binary"),
            Err(CharsmithError::ToolNotFound(_))
        ));
    }
}
