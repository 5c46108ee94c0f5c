use crate::output::{print_json, print_table};
use anyhow::Context;
use charsmith_core::clients::parse_client_tokens;
use charsmith_core::config::Config;
use charsmith_core::fly::{DeployPlan, DeployRequest, ProcessRunner};
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct DeployArgs {
    /// Agent runtime checkout relative to the root
    pub agent_repo: String,
    pub username: String,
    pub agent_name: String,
    /// Fly.io organization slug
    pub organization: String,
    /// Model provider the agent runs against (openai, anthropic)
    pub llm_model: String,
    pub llm_api_key: String,
    pub fal_api_key: String,
    /// JSON object of channel credentials, e.g. '{"telegram": "<token>"}'
    pub clients_json: String,
    pub fly_access_token: String,

    /// Print the flyctl calls without running them
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(root: &Path, args: DeployArgs, json: bool) -> anyhow::Result<()> {
    let client_tokens = parse_client_tokens(&args.clients_json)?;
    let request = DeployRequest {
        agent_repo: args.agent_repo,
        username: args.username,
        agent_name: args.agent_name,
        organization: args.organization,
        llm_provider: args.llm_model,
        llm_api_key: args.llm_api_key,
        fal_api_key: args.fal_api_key,
        client_tokens,
        fly_access_token: args.fly_access_token,
    };
    let plan = DeployPlan::build(root, &request).context("cannot deploy")?;

    if args.dry_run {
        if json {
            print_json(&serde_json::json!({
                "app": plan.app,
                "fly_toml": plan.fly_toml.display().to_string(),
                "secrets": plan.secret_names,
                "steps": plan.steps.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            }))?;
        } else {
            let rows: Vec<Vec<String>> = plan
                .steps
                .iter()
                .enumerate()
                .map(|(i, step)| {
                    vec![
                        (i + 1).to_string(),
                        format!("flyctl {step}"),
                        step.cwd
                            .as_ref()
                            .map(|d| d.display().to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            print_table(&["STEP", "COMMAND", "DIR"], &rows);
        }
        return Ok(());
    }

    let config = Config::load(root).context("failed to load config")?;
    let runner = ProcessRunner::locate(&config.deploy.flyctl)?;
    plan.execute(&runner)
        .with_context(|| format!("deployment of {} failed", plan.app))?;

    if json {
        print_json(&serde_json::json!({ "app": plan.app, "deployed": true }))?;
    } else {
        println!("Deployed {}", plan.app);
    }
    Ok(())
}
