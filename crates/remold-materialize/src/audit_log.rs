use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};

use remold_core::config::LayoutKind;
use remold_core::model::AuditEntry;

use crate::error::{LogFailure, MaterializeError};

/// Minute resolution for in-place runs.
pub const IN_PLACE_LOG_FORMAT: &str = "%Y-%m-%d_%H%M";
/// Second resolution for timestamped-tree runs.
pub const TREE_LOG_FORMAT: &str = "%Y-%m-%d_%H%M%S";

const MAX_NAME_ATTEMPTS: usize = 1000;

/// The timestamp recorded in an entry and used to name its file.
pub fn log_stamp(layout: LayoutKind, at: DateTime<Local>) -> String {
    let format = match layout {
        LayoutKind::InPlace => IN_PLACE_LOG_FORMAT,
        LayoutKind::TimestampedTree => TREE_LOG_FORMAT,
    };
    at.format(format).to_string()
}

/// SHA-256 of the original source, hex encoded.
pub fn source_digest(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogHandle {
    pub path: PathBuf,
}

/// Sole writer to the audit log directory.
///
/// Each run gets its own file, created with `create_new`; concurrent runs
/// never share or overwrite a file, so no locking is needed.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    dir: PathBuf,
}

impl AuditLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a new record named after `entry.refactor_timestamp`.
    pub fn log(&self, entry: &AuditEntry) -> Result<LogHandle, LogFailure> {
        let failure = |error: String| LogFailure {
            dir: self.dir.clone(),
            error,
        };

        fs::create_dir_all(&self.dir).map_err(|e| failure(e.to_string()))?;
        let json = serde_json::to_string_pretty(entry).map_err(|e| failure(e.to_string()))?;
        let (path, mut file) = self
            .create_unique(&entry.refactor_timestamp)
            .map_err(|e| failure(e.to_string()))?;

        if let Err(e) = file.write_all(json.as_bytes()).and_then(|()| file.sync_all()) {
            let _ = fs::remove_file(&path);
            return Err(failure(e.to_string()));
        }

        tracing::info!(path = %path.display(), "audit entry written");
        Ok(LogHandle { path })
    }

    fn create_unique(&self, stamp: &str) -> std::io::Result<(PathBuf, fs::File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stamp}.json")
            } else {
                format!("{stamp}-{attempt}.json")
            };
            let path = self.dir.join(name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("too many audit entries for {stamp}"),
        ))
    }

    /// All readable entries, newest first. Unparseable files are skipped.
    pub fn list(&self) -> Result<Vec<(PathBuf, AuditEntry)>, MaterializeError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for dirent in fs::read_dir(&self.dir)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(MaterializeError::from)
                .and_then(|data| {
                    serde_json::from_str::<AuditEntry>(&data).map_err(MaterializeError::from)
                })
            {
                Ok(entry) => entries.push((path, entry)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping audit file"),
            }
        }

        entries.sort_by(|(pa, a), (pb, b)| {
            b.refactor_timestamp
                .cmp(&a.refactor_timestamp)
                .then_with(|| pb.cmp(pa))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use remold_core::model::{Initiator, RefactorResult, RunId};
    use tempfile::TempDir;

    fn entry(stamp: &str) -> AuditEntry {
        AuditEntry {
            result: RefactorResult::new("print(1)"),
            original_file: "/p/main.py".into(),
            refactor_timestamp: stamp.into(),
            initiator: Initiator::Cli,
            run_id: RunId::new(),
            layout: LayoutKind::InPlace,
            output_root: None,
            source_sha256: Some(source_digest("print(0)")),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_log_stamp_resolution() {
        let at = Local.with_ymd_and_hms(2025, 7, 5, 18, 37, 26).unwrap();
        assert_eq!(log_stamp(LayoutKind::InPlace, at), "2025-07-05_1837");
        assert_eq!(log_stamp(LayoutKind::TimestampedTree, at), "2025-07-05_183726");
    }

    #[test]
    fn test_log_writes_json_named_by_stamp() {
        let tmp = TempDir::new().unwrap();
        let logger = AuditLogger::new(tmp.path().join("refactor_logs"));
        let handle = logger.log(&entry("2025-07-05_1837")).unwrap();
        assert_eq!(handle.path, tmp.path().join("refactor_logs/2025-07-05_1837.json"));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&handle.path).unwrap()).unwrap();
        assert_eq!(value["primary_content"], "print(1)");
        assert_eq!(value["original_file"], "/p/main.py");
        assert_eq!(value["refactor_timestamp"], "2025-07-05_1837");
        assert_eq!(value["initiator"], "cli");
    }

    #[test]
    fn test_same_stamp_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let logger = AuditLogger::new(tmp.path());
        let first = logger.log(&entry("2025-07-05_1837")).unwrap();
        let second = logger.log(&entry("2025-07-05_1837")).unwrap();
        assert_ne!(first.path, second.path);
        assert!(second.path.ends_with("2025-07-05_1837-1.json"));
        assert_eq!(logger.list().unwrap().len(), 2);
    }

    #[test]
    fn test_unwritable_dir_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("refactor_logs");
        fs::write(&blocker, "not a directory").unwrap();
        let failure = AuditLogger::new(&blocker).log(&entry("x")).unwrap_err();
        assert_eq!(failure.dir, blocker);
        assert!(failure.to_string().starts_with("failed to write audit log"));
    }

    #[test]
    fn test_list_newest_first_and_skips_garbage() {
        let tmp = TempDir::new().unwrap();
        let logger = AuditLogger::new(tmp.path());
        logger.log(&entry("2025-07-05_1830")).unwrap();
        logger.log(&entry("2025-07-06_0900")).unwrap();
        fs::write(tmp.path().join("broken.json"), "{").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let listed = logger.list().unwrap();
        let stamps: Vec<_> = listed
            .iter()
            .map(|(_, e)| e.refactor_timestamp.as_str())
            .collect();
        assert_eq!(stamps, vec!["2025-07-06_0900", "2025-07-05_1830"]);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(AuditLogger::new(tmp.path().join("none")).list().unwrap().is_empty());
    }

    #[test]
    fn test_source_digest() {
        assert_eq!(
            source_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
