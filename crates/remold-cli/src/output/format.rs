use std::path::PathBuf;

use remold_core::model::{AuditEntry, FileOutcome, FileRole, FileStatus, RefactorResult};
use remold_materialize::{LogFailure, LogHandle, MaterializationReport};
use remold_sdk::ParseFailure;
use serde_json::json;

use super::OutputFormat;

pub fn format_preview(result: &RefactorResult, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
        OutputFormat::Text => result.to_preview(),
    }
}

pub fn format_parse_failure(failure: &ParseFailure, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "stage": failure.stage(),
            "reason": failure.reason(),
            "raw_excerpt": failure.raw_excerpt(),
        }))
        .unwrap_or_default(),
        OutputFormat::Text => format!(
            "Error: {}\n\nRaw response (excerpt):\n{}\n",
            failure.reason(),
            failure.raw_excerpt()
        ),
    }
}

pub fn format_report(
    report: &MaterializationReport,
    log: Option<&Result<LogHandle, LogFailure>>,
    fmt: OutputFormat,
) -> String {
    match fmt {
        OutputFormat::Json => {
            let log = match log {
                Some(Ok(handle)) => json!({ "path": handle.path }),
                Some(Err(e)) => json!({ "error": e.to_string() }),
                None => serde_json::Value::Null,
            };
            serde_json::to_string_pretty(&json!({ "report": report, "log": log }))
                .unwrap_or_default()
        }
        OutputFormat::Text => format_report_text(report, log),
    }
}

fn format_report_text(
    report: &MaterializationReport,
    log: Option<&Result<LogHandle, LogFailure>>,
) -> String {
    let mut out = format!("Output: {}\n", report.root.display());
    for file in &report.per_file_status {
        out.push_str(&format!("  {}\n", format_outcome(file)));
    }
    out.push_str(&format!(
        "{} written, {} skipped\n",
        report.written_count(),
        report.skipped_count()
    ));
    match log {
        Some(Ok(handle)) => out.push_str(&format!("Logged to {}\n", handle.path.display())),
        Some(Err(e)) => out.push_str(&format!("Warning: {e}\n")),
        None => {}
    }
    out
}

fn format_outcome(file: &FileOutcome) -> String {
    let role = match file.role {
        FileRole::Backup => "backup",
        FileRole::Primary => "primary",
        FileRole::Utility => "utility",
    };
    let target = file
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .or_else(|| file.logical_name.clone())
        .unwrap_or_default();
    match &file.status {
        FileStatus::Written => format!("+ {role:<8} {target}"),
        FileStatus::Skipped { reason } => format!("- {role:<8} {target} (skipped: {reason})"),
        FileStatus::Rejected { reason } => format!("! {role:<8} {target} (rejected: {reason})"),
        FileStatus::Failed { error } => format!("x {role:<8} {target} (failed: {error})"),
    }
}

pub fn format_log_list(entries: &[(PathBuf, AuditEntry)], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => {
            let list: Vec<_> = entries.iter().map(|(_, e)| e).collect();
            serde_json::to_string_pretty(&list).unwrap_or_default()
        }
        OutputFormat::Text => format_log_list_text(entries),
    }
}

fn format_log_list_text(entries: &[(PathBuf, AuditEntry)]) -> String {
    if entries.is_empty() {
        return "No audit entries found.\n".to_string();
    }

    let mut out = String::new();
    for (path, e) in entries {
        let written = e.files.iter().filter(|f| f.status.is_written()).count();
        out.push_str(&format!(
            "\u{25c6} {} {} [{}] {} modules, {written} files written  {}\n",
            e.run_id.short(),
            e.refactor_timestamp,
            e.initiator,
            e.result.utility_modules.len(),
            e.original_file,
        ));
        out.push_str(&format!("    {}\n", path.display()));
    }
    out
}
