mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, notify::NotifySubcommand};
use safe_notify_core::types::Environment;
use settings::Settings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "safe-notify",
    about = "Throttled Slack notifications for SAFe planning, sync, and agent events",
    version,
    propagate_version = true
)]
struct Cli {
    /// Deployment environment: development, staging, or production
    #[arg(long, global = true, env = "SAFE_NOTIFY_ENV", default_value = "development")]
    env: Environment,

    /// YAML file overriding the environment defaults
    #[arg(long, global = true, env = "SAFE_NOTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log notifications instead of posting them to Slack
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one notification
    Notify {
        #[command(subcommand)]
        subcommand: NotifySubcommand,
    },

    /// Show, validate, or generate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the HTTP notification server
    Serve {
        #[arg(long, default_value = "8787")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ if cli.dry_run => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings {
        environment: cli.env,
        config_path: cli.config,
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Commands::Notify { subcommand } => cmd::notify::run(&settings, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&settings, subcommand, cli.json),
        Commands::Serve { port } => cmd::serve::run(&settings, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
