use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::result::RefactorResult;
use super::session::RunId;
use crate::config::LayoutKind;

/// Which caller path triggered a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Initiator {
    Cli,
    Sdk,
    Service,
}

impl std::fmt::Display for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cli => "cli",
            Self::Sdk => "sdk",
            Self::Service => "service",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Backup,
    Primary,
    Utility,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Written,
    Skipped { reason: String },
    Rejected { reason: String },
    Failed { error: String },
}

impl FileStatus {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }
}

/// Outcome of a single file write, each an independent unit of failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileOutcome {
    pub role: FileRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// One audit log record. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub result: RefactorResult,
    pub original_file: String,
    pub refactor_timestamp: String,
    pub initiator: Initiator,
    pub run_id: RunId,
    pub layout: LayoutKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_flattens_result_fields() {
        let entry = AuditEntry {
            result: RefactorResult::new("print(1)").with_module("io.py", "x"),
            original_file: "/tmp/main.py".into(),
            refactor_timestamp: "2025-07-05_1830".into(),
            initiator: Initiator::Cli,
            run_id: RunId("abcdef0123456789abcdef0123456789".into()),
            layout: LayoutKind::InPlace,
            output_root: None,
            source_sha256: None,
            files: vec![FileOutcome {
                role: FileRole::Utility,
                logical_name: Some("../x".into()),
                path: None,
                status: FileStatus::Rejected {
                    reason: "parent-directory traversal".into(),
                },
            }],
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["primary_content"], "print(1)");
        assert_eq!(value["utility_modules"]["io.py"], "x");
        assert_eq!(value["initiator"], "cli");
        assert_eq!(value["layout"], "in_place");
        assert_eq!(value["files"][0]["status"], "rejected");

        let parsed: AuditEntry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, entry);
    }
}
