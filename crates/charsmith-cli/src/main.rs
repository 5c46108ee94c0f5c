mod cmd;
mod output;
mod root;
mod service;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, deploy::DeployArgs, fly_toml::FlyTomlArgs, generate::GenerateArgs,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "charsmith",
    about = "Generate schema-checked agent character files and deploy them to Fly.io",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from charsmith.yaml or .git/)
    #[arg(long, global = true, env = "CHARSMITH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress (info level) to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a character file with the text-generation service
    Generate(GenerateArgs),

    /// Check an existing character file against the schema
    Validate {
        /// Path to a .character.json file
        file: PathBuf,
    },

    /// Print the character JSON schema
    Schema,

    /// Write users/<username>/fly.toml for an agent
    FlyToml(FlyTomlArgs),

    /// Create the Fly.io app, set its secrets and deploy it
    Deploy(DeployArgs),

    /// Inspect and validate charsmith.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Generate(args) => cmd::generate::run(&root, args, cli.json),
        Commands::Validate { file } => cmd::validate::run(&file, cli.json),
        Commands::Schema => cmd::schema::run(),
        Commands::FlyToml(args) => cmd::fly_toml::run(&root, args, cli.json),
        Commands::Deploy(args) => cmd::deploy::run(&root, args, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
