use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use remold_core::config::RemoldConfig;
use remold_core::model::Initiator;
use remold_sdk::{PipelineOptions, RefactorPipeline};

use crate::output::format::{format_parse_failure, format_preview};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ExtractArgs {
    /// Saved agent reply
    pub transcript: PathBuf,
}

pub fn run(args: &ExtractArgs, config: &RemoldConfig, format: OutputFormat) -> Result<()> {
    let transcript = std::fs::read_to_string(&args.transcript)
        .with_context(|| format!("Failed to read {}", args.transcript.display()))?;

    let pipeline = RefactorPipeline::new(PipelineOptions::from_config(config, Initiator::Cli));
    match pipeline.parse(&transcript) {
        Ok((payload, result)) => {
            tracing::info!(strategy = payload.strategy, "payload extracted");
            print!("{}", format_preview(&result, format));
            Ok(())
        }
        Err(failure) => {
            print!("{}", format_parse_failure(&failure, format));
            anyhow::bail!("{}", failure.reason())
        }
    }
}
