pub mod audit;
pub mod result;
pub mod session;

pub use audit::{AuditEntry, FileOutcome, FileRole, FileStatus, Initiator};
pub use result::RefactorResult;
pub use session::{RunId, RunMode, RunSession, RunStatus, Stage};
