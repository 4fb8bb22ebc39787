use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use remold_core::config::{check_tree_label, BackupPolicy, LayoutKind, RemoldConfig};
use remold_core::gate::parse_answer;
use remold_core::model::{Initiator, RefactorResult};
use remold_core::{Answer, Confirm};
use remold_sdk::{CommandAgent, PipelineOptions, RefactorPipeline, RunOutcome, SuggestionKind};

use crate::output::format::{format_parse_failure, format_preview, format_report};
use crate::output::OutputFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LayoutArg {
    /// Overwrite the file, keep a `.backup` beside it
    InPlace,
    /// Write a fresh `<label>_<stamp>/{before,after,utils}` tree
    Tree,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackupArg {
    /// Back up the file as read from disk
    Original,
    /// Back up the agent's `backup_content` instead
    PayloadOnly,
    Disabled,
}

#[derive(Args)]
pub struct RefactorArgs {
    /// File to refactor
    pub file: PathBuf,

    /// Use a saved agent reply instead of invoking an agent
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Agent command; the request is written to its stdin
    #[arg(long, env = "REMOLD_AGENT_CMD")]
    pub agent_cmd: Option<String>,

    /// Kind of suggestion to ask for (refactor, optimize, document, style, security)
    #[arg(long = "type", default_value = "refactor")]
    pub kind: SuggestionKind,

    /// Show the result without writing anything
    #[arg(long)]
    pub preview: bool,

    /// Apply without asking
    #[arg(long, short)]
    pub yes: bool,

    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Directory name prefix for tree output
    #[arg(long)]
    pub label: Option<String>,

    /// Base directory for tree output
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub backup: Option<BackupArg>,

    /// Audit log directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl RefactorArgs {
    fn apply_to(&self, config: &mut RemoldConfig) {
        if self.preview {
            config.preview_only = true;
        }
        if self.yes {
            config.confirm = false;
        }
        if let Some(layout) = self.layout {
            config.layout = match layout {
                LayoutArg::InPlace => LayoutKind::InPlace,
                LayoutArg::Tree => LayoutKind::TimestampedTree,
            };
        }
        if let Some(label) = &self.label {
            config.tree_label = label.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(backup) = self.backup {
            config.backup_policy = match backup {
                BackupArg::Original => BackupPolicy::Original,
                BackupArg::PayloadOnly => BackupPolicy::PayloadOnly,
                BackupArg::Disabled => BackupPolicy::Disabled,
            };
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(cmd) = &self.agent_cmd {
            config.agent_command = Some(cmd.clone());
        }
    }
}

/// Shows the preview, then asks once on stdin.
struct StdinConfirm {
    format: OutputFormat,
}

impl Confirm for StdinConfirm {
    fn ask(&mut self, result: &RefactorResult) -> Answer {
        if let OutputFormat::Text = self.format {
            print!("{}", format_preview(result, self.format));
        }
        eprint!("Apply these changes? [y/N]: ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => Answer::Cancelled,
            Ok(_) => parse_answer(&line),
        }
    }
}

pub fn run(args: &RefactorArgs, mut config: RemoldConfig, format: OutputFormat) -> Result<()> {
    args.apply_to(&mut config);
    check_tree_label(&config.tree_label).context("Invalid --label")?;

    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let pipeline = RefactorPipeline::new(PipelineOptions::from_config(&config, Initiator::Cli));
    let mut confirm = StdinConfirm { format };

    let run = match &args.transcript {
        Some(path) => {
            let transcript = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read transcript {}", path.display()))?;
            pipeline.run(&args.file, &source, &transcript, &mut confirm)
        }
        None => {
            let command = config.agent_command.as_deref().ok_or_else(|| {
                anyhow::anyhow!("No transcript or agent command. Use --transcript or --agent-cmd.")
            })?;
            let agent = CommandAgent::parse(command)?;
            pipeline.run_with_agent(
                &agent,
                args.kind.instruction(),
                &args.file,
                &source,
                &mut confirm,
            )
        }
    };

    match run.outcome {
        RunOutcome::AgentFailed(e) => Err(e).context("Agent failed"),
        RunOutcome::ParseFailed(failure) => {
            print!("{}", format_parse_failure(&failure, format));
            anyhow::bail!("{}", failure.reason())
        }
        RunOutcome::Previewed(result) => {
            print!("{}", format_preview(&result, format));
            if let OutputFormat::Text = format {
                println!("Preview only. Nothing was written.");
            }
            Ok(())
        }
        RunOutcome::Discarded(_) => {
            println!("Changes discarded. Nothing was written.");
            Ok(())
        }
        RunOutcome::Applied { report, log, .. } => {
            print!("{}", format_report(&report, log.as_ref(), format));
            if !report.primary_written() {
                anyhow::bail!("{} was not updated", args.file.display());
            }
            Ok(())
        }
        RunOutcome::MaterializeFailed { error, .. } => {
            Err(error).context("Failed to prepare output location")
        }
    }
}
