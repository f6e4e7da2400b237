mod cmd;
mod output;
mod scenario;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;
use trixta_core::channel::DEFAULT_NAMESPACE;

#[derive(Parser)]
#[command(
    name = "trixta",
    about = "Role channel orchestration: channel topics, config checks, and loopback simulation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log engine activity at INFO (RUST_LOG takes precedence)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the channel topic for a role
    Topic {
        role: String,
        #[arg(long, env = "TRIXTA_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },

    /// Create and validate engine config files
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run a scenario against the in-memory channel service
    Simulate {
        /// Scenario YAML file
        scenario: PathBuf,
        /// Engine config (default: built-in defaults)
        #[arg(long, env = "TRIXTA_CONFIG")]
        config: Option<PathBuf>,
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

    let result = match cli.command {
        Commands::Topic { role, namespace } => cmd::topic::run(&role, &namespace, cli.json),
        Commands::Config { subcommand } => cmd::config::run(subcommand, cli.json),
        Commands::Simulate { scenario, config } => {
            cmd::simulate::run(&scenario, config.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
