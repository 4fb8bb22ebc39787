use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use remold_core::config::{RemoldConfig, CONFIG_FILE};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "remold",
    version,
    about = "Apply agent refactor suggestions to disk, safely and with an audit trail"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    /// Config file (default: ./.remold.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RemoldConfig> {
    match path {
        Some(path) => RemoldConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => RemoldConfig::load_or_default(Path::new(CONFIG_FILE))
            .with_context(|| format!("Failed to load {CONFIG_FILE}")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        commands::Commands::Refactor(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::refactor::run(args, config, cli.format)
        }
        commands::Commands::Extract(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::extract::run(args, &config, cli.format)
        }
        commands::Commands::Logs(args) => {
            let config = load_config(cli.config.as_ref())?;
            commands::logs::run(args, &config, cli.format)
        }
        commands::Commands::Init(args) => commands::init::run(args, cli.config.as_deref()),
        commands::Commands::Version => commands::version::run(),
    }
}
