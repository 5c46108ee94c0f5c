use crate::output::print_json;
use crate::service::ChatService;
use anyhow::Context;
use charsmith_core::character::CharacterDocument;
use charsmith_core::clients::parse_client_list;
use charsmith_core::config::Config;
use charsmith_core::generator::Generator;
use charsmith_core::prompt::CharacterRequest;
use charsmith_core::{paths, store};
use clap::Args;
use openai_chat::{ChatClient, ClientOptions};
use std::path::Path;

#[derive(Args)]
pub struct GenerateArgs {
    /// API key for the text-generation service
    pub api_key: String,
    /// Character name, copied verbatim into the document
    pub agent_name: String,
    pub personality: String,
    pub appearance: String,
    pub body_type: String,
    pub occupation: String,
    /// JSON array of integration channels, e.g. '["telegram"]'
    pub clients: String,
    /// Model provider the agent runs against, e.g. openai
    pub model_provider: String,
    /// Owner; files go under characters/<username>/ when given
    pub username: Option<String>,
    /// Agent runtime checkout relative to the root (default: output.agent_repo)
    pub agent_repo: Option<String>,

    /// Print the document instead of writing it
    #[arg(long)]
    pub stdout: bool,

    /// Total attempts before giving up (default: generation.max_attempts)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Model identifier (default: generation.model)
    #[arg(long)]
    pub model: Option<String>,

    /// Per-request timeout in seconds (default: generation.timeout_secs)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Pause between attempts in milliseconds (default: generation.retry_delay_ms)
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Service base URL (default: generation.api_base)
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,
}

pub fn run(root: &Path, args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    // Input errors surface before any outbound call.
    let clients = parse_client_list(&args.clients)?;
    paths::validate_path_component("agent name", &args.agent_name)?;
    if let Some(user) = &args.username {
        paths::validate_path_component("username", user)?;
    }
    if let Some(repo) = &args.agent_repo {
        paths::validate_path_component("agent repo", repo)?;
    }

    let mut config = Config::load(root).context("failed to load config")?;
    let generation = &mut config.generation;
    if let Some(model) = args.model {
        generation.model = model;
    }
    if let Some(n) = args.max_attempts {
        generation.max_attempts = n;
    }
    if let Some(secs) = args.timeout_secs {
        generation.timeout_secs = secs;
    }
    if let Some(ms) = args.retry_delay_ms {
        generation.retry_delay_ms = ms;
    }
    if let Some(base) = args.api_base {
        generation.api_base = base;
    }

    let options = ClientOptions {
        api_base: generation.api_base.clone(),
        timeout: generation.timeout(),
        organization: None,
    };
    let client = ChatClient::new(args.api_key, options).context("invalid client settings")?;
    let service = ChatService::new(client, generation.model.clone());
    let generator = Generator::new(service, generation.retry_policy());

    let request = CharacterRequest {
        name: args.agent_name,
        personality: args.personality,
        appearance: args.appearance,
        body_type: args.body_type,
        occupation: args.occupation,
        clients,
        model_provider: args.model_provider,
    };

    let generated = generator
        .generate(&request, &config.defaults)
        .with_context(|| format!("could not generate character '{}'", request.name))?;

    if args.stdout {
        println!("{}", store::to_pretty_json(&generated.document)?);
        return Ok(());
    }

    // Everything that can fail runs before the file is written.
    let doc = CharacterDocument::from_value(generated.document.clone())?;
    let agent_repo = args
        .agent_repo
        .unwrap_or_else(|| config.output.agent_repo.clone());
    let path = paths::character_file(root, &agent_repo, args.username.as_deref(), &request.name);
    store::save_character(&path, &generated.document)
        .with_context(|| format!("failed to save {}", path.display()))?;

    if json {
        let (exchanges, turns) = doc.example_counts();
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "name": doc.name,
            "attempts": generated.attempts,
            "message_examples": exchanges,
            "example_turns": turns,
            "post_examples": doc.post_examples.len(),
        }))?;
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
