use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use remold_core::config::{RemoldConfig, CONFIG_FILE};

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, config_path: Option<&Path>) -> Result<()> {
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE));

    if path.exists() && !args.force {
        println!("{} already exists.", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    RemoldConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default config to {}.", path.display());
    println!();
    println!("Next steps:");
    println!("  remold refactor <file> --transcript <reply>   Apply a saved agent reply");
    println!("  remold refactor <file> --agent-cmd <cmd>      Ask an agent command directly");
    println!("  remold logs                                   List past runs");
    Ok(())
}
