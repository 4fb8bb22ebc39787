use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for one run.
/// Generated as UUID v4 hex (no dashes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for display.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Preview,
    Apply,
}

/// Which stage stopped a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Agent,
    Extraction,
    Validation,
    Materialization,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Previewed,
    Discarded,
    Applied { files_written: usize, files_skipped: usize },
    Failed { stage: Stage, reason: String },
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One extraction-to-materialization attempt. Never reused across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSession {
    pub id: RunId,
    pub input_path: PathBuf,
    pub mode: RunMode,
    pub started_at: DateTime<Local>,
    pub status: RunStatus,
}

impl RunSession {
    pub fn start(input_path: impl Into<PathBuf>, mode: RunMode) -> Self {
        Self {
            id: RunId::new(),
            input_path: input_path.into(),
            mode,
            started_at: Local::now(),
            status: RunStatus::Running,
        }
    }

    /// Move to a terminal status. The first terminal status sticks.
    pub fn finish(&mut self, status: RunStatus) {
        if self.status.is_terminal() {
            tracing::warn!(run = %self.id.short(), "ignoring second terminal status");
            return;
        }
        self.status = status;
    }

    pub fn fail(&mut self, stage: Stage, reason: impl Into<String>) {
        self.finish(RunStatus::Failed {
            stage,
            reason: reason.into(),
        });
    }
}
