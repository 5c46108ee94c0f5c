use crate::output::print_json;
use anyhow::Context;
use charsmith_core::config::Config;
use charsmith_core::fly::{app_name, write_fly_toml};
use chrono::Utc;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct FlyTomlArgs {
    pub username: String,
    pub agent_name: String,
    /// Fly.io app name (default: <username>-<agent>-<timestamp>)
    pub app_name: Option<String>,
}

pub fn run(root: &Path, args: FlyTomlArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let app = match args.app_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => app_name(&args.username, &args.agent_name, Utc::now()),
    };

    let path = write_fly_toml(root, &args.username, &args.agent_name, &app, &config.deploy)
        .context("failed to write fly.toml")?;

    if json {
        print_json(&serde_json::json!({
            "app": app,
            "path": path.display().to_string(),
        }))?;
    } else {
        println!("Wrote {} (app: {app})", path.display());
    }
    Ok(())
}
