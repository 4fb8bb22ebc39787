use anyhow::{Context, Result};
use clap::Args;
use remold_core::config::RemoldConfig;
use remold_materialize::AuditLogger;

use crate::output::format::format_log_list;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct LogsArgs {
    /// Maximum number of entries
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Audit log directory (overrides config)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

pub fn run(args: &LogsArgs, config: &RemoldConfig, format: OutputFormat) -> Result<()> {
    let dir = args.log_dir.as_ref().unwrap_or(&config.log_dir);
    let logger = AuditLogger::new(dir);

    let mut entries = logger
        .list()
        .with_context(|| format!("Failed to read audit logs in {}", dir.display()))?;
    entries.truncate(args.limit);

    print!("{}", format_log_list(&entries, format));
    Ok(())
}
