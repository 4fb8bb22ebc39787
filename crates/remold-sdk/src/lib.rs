//! Run agent refactor transcripts through extraction, validation, the
//! decision gate, materialization and audit logging.
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//! use remold_sdk::{PipelineOptions, RefactorPipeline, RunOutcome};
//!
//! let pipeline = RefactorPipeline::new(PipelineOptions::default());
//! let source = std::fs::read_to_string("main.py").unwrap();
//! let transcript = std::fs::read_to_string("reply.md").unwrap();
//!
//! // Auto-approve; the CLI asks on stdin instead.
//! let run = pipeline.run(Path::new("main.py"), &source, &transcript, &mut || true);
//! if let RunOutcome::Applied { report, .. } = &run.outcome {
//!     println!("{} files written under {}", report.written_count(), report.root.display());
//! }
//! ```

mod agent;
mod error;
mod pipeline;
mod pool;

pub use agent::{build_request, CommandAgent, RefactorAgent, SuggestionKind};
pub use error::{AgentError, PoolError};
pub use pipeline::{ParseFailure, PipelineOptions, PipelineRun, RefactorPipeline, RunOutcome};
pub use pool::BlockingPool;

// Re-export the types SDK users handle directly
pub use remold_core::config::{BackupPolicy, LayoutKind, RemoldConfig};
pub use remold_core::model::{AuditEntry, FileOutcome, FileStatus, Initiator, RefactorResult, RunSession, RunStatus};
pub use remold_core::{Answer, Confirm, GateMode};
pub use remold_materialize::{Layout, LogFailure, MaterializationReport};
