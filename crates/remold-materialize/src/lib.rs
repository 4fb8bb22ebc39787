//! Filesystem side of the remold pipeline: sanitizing untrusted module
//! names, writing the backup, primary and utility files, and appending
//! the audit trail.

pub mod audit_log;
pub mod error;
pub mod plan;
pub mod sanitize;
pub mod writer;

pub use audit_log::{log_stamp, source_digest, AuditLogger, LogHandle};
pub use error::{LogFailure, MaterializeError};
pub use plan::MaterializationPlan;
pub use sanitize::{sanitize, Nesting, PathRejection, SafePath};
pub use writer::{materialize, Layout, MaterializationReport, MaterializeContext};
