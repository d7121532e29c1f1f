use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "auditsync")]
#[command(about = "Mirror audit log feeds into blob storage", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize configured streams
    Run {
        /// Only synchronize this stream (repeatable)
        #[arg(long = "stream")]
        streams: Vec<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config
    Init {
        #[arg(long)]
        stdout: bool,
    },
    /// Validate a config and list its streams
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auditsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = auditsync::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { streams }) => {
            auditsync::cli::run::run(config_path, streams).await?;
        }
        None => {
            auditsync::cli::run::run(config_path, Vec::new()).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => auditsync::cli::config::init(stdout)?,
            ConfigAction::Check => auditsync::cli::config::check(config_path)?,
        },
    }

    Ok(())
}
