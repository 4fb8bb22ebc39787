use std::fs;
use std::io::{Seek, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use remold_core::config::{check_tree_label, BackupPolicy, LayoutKind};
use remold_core::model::{FileOutcome, FileRole, FileStatus, RefactorResult};

use crate::error::MaterializeError;
use crate::plan::{MaterializationPlan, PlannedFile, Step, AFTER_DIR, BEFORE_DIR, UTILS_DIR};

/// Stamp used in timestamped-tree directory names.
pub const TREE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const MAX_TREE_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    InPlace,
    TimestampedTree { base_dir: PathBuf, label: String },
}

impl Layout {
    pub fn kind(&self) -> LayoutKind {
        match self {
            Self::InPlace => LayoutKind::InPlace,
            Self::TimestampedTree { .. } => LayoutKind::TimestampedTree,
        }
    }
}

/// Everything the Materializer needs besides the validated result.
#[derive(Debug, Clone)]
pub struct MaterializeContext<'a> {
    /// The file under refactor.
    pub target: &'a Path,
    pub original_source: &'a str,
    pub layout: Layout,
    pub backup_policy: BackupPolicy,
    pub started_at: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializationReport {
    pub root: PathBuf,
    pub layout: LayoutKind,
    pub per_file_status: Vec<FileOutcome>,
}

impl MaterializationReport {
    pub fn primary_written(&self) -> bool {
        self.per_file_status
            .iter()
            .any(|f| f.role == FileRole::Primary && f.status.is_written())
    }

    pub fn written_count(&self) -> usize {
        self.per_file_status
            .iter()
            .filter(|f| f.status.is_written())
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.per_file_status.len() - self.written_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.per_file_status
            .iter()
            .filter(|f| !f.status.is_written())
    }
}

/// Write a validated result to disk.
///
/// The backup (or `before/` copy) is written and synced before the primary
/// file is touched; if it fails the primary is left alone. Utility modules
/// come last and each succeeds or fails on its own.
pub fn materialize(
    result: &RefactorResult,
    ctx: &MaterializeContext<'_>,
) -> Result<MaterializationReport, MaterializeError> {
    let plan = match &ctx.layout {
        Layout::InPlace => {
            MaterializationPlan::in_place(result, ctx.target, ctx.original_source, ctx.backup_policy)?
        }
        Layout::TimestampedTree { base_dir, label } => {
            let file_name = ctx
                .target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| MaterializeError::InvalidTarget(ctx.target.display().to_string()))?;
            let tree_root = create_tree_root(base_dir, label, ctx.started_at)?;
            for sub in [BEFORE_DIR, AFTER_DIR, UTILS_DIR] {
                fs::create_dir_all(tree_root.join(sub))?;
            }
            MaterializationPlan::tree(
                result,
                &tree_root,
                &file_name,
                ctx.original_source,
                ctx.backup_policy,
            )
        }
    };

    Ok(execute(&plan))
}

/// Run a resolved plan. Never fails as a whole; every outcome is recorded.
pub fn execute(plan: &MaterializationPlan) -> MaterializationReport {
    let mut per_file_status = Vec::with_capacity(plan.utilities.len() + 2);

    let backup_ok = match &plan.backup {
        Step::Write(file) => {
            let outcome = write_step(file, plan.layout);
            let ok = outcome.status.is_written();
            per_file_status.push(outcome);
            ok
        }
        Step::Skip(outcome) => {
            per_file_status.push(outcome.clone());
            true
        }
    };

    if backup_ok {
        per_file_status.push(write_step(&plan.primary, plan.layout));
    } else {
        tracing::warn!(path = %plan.primary.path.display(), "backup failed, primary left untouched");
        per_file_status.push(plan.primary.outcome(FileStatus::Skipped {
            reason: "backup could not be written".into(),
        }));
    }

    for step in &plan.utilities {
        match step {
            Step::Write(file) => per_file_status.push(write_step(file, plan.layout)),
            Step::Skip(outcome) => per_file_status.push(outcome.clone()),
        }
    }

    let report = MaterializationReport {
        root: plan.root.clone(),
        layout: plan.layout,
        per_file_status,
    };
    tracing::info!(
        root = %report.root.display(),
        written = report.written_count(),
        skipped = report.skipped_count(),
        "materialization finished"
    );
    report
}

fn write_step(file: &PlannedFile, layout: LayoutKind) -> FileOutcome {
    let written = if file.role == FileRole::Primary && layout == LayoutKind::InPlace {
        rewrite_locked(&file.path, &file.content)
    } else {
        write_durable(&file.path, &file.content)
    };
    match written {
        Ok(()) => {
            tracing::info!(role = ?file.role, path = %file.path.display(), "wrote file");
            file.outcome(FileStatus::Written)
        }
        Err(e) => {
            tracing::warn!(role = ?file.role, path = %file.path.display(), error = %e, "write failed");
            file.outcome(FileStatus::Failed {
                error: e.to_string(),
            })
        }
    }
}

/// Create parents, write, and flush to disk.
pub fn write_durable(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// Overwrite an existing file under an exclusive lock so concurrent runs
/// against the same target do not interleave.
fn rewrite_locked(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    fs2::FileExt::lock_exclusive(&file)?;
    let written = truncate_and_write(&mut file, content);
    fs2::FileExt::unlock(&file)?;
    written
}

fn truncate_and_write(file: &mut fs::File, content: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// Create `<base>/<label>_<stamp>`, adding `_1`, `_2`, ... if a previous
/// run already claimed the name.
fn create_tree_root(
    base_dir: &Path,
    label: &str,
    started_at: DateTime<Local>,
) -> Result<PathBuf, MaterializeError> {
    check_tree_label(label).map_err(|e| MaterializeError::InvalidLabel(e.to_string()))?;
    fs::create_dir_all(base_dir).map_err(|source| MaterializeError::TreeRoot {
        path: base_dir.to_path_buf(),
        source,
    })?;
    let stem = format!("{label}_{}", started_at.format(TREE_STAMP_FORMAT));

    for attempt in 0..MAX_TREE_ATTEMPTS {
        let name = if attempt == 0 {
            stem.clone()
        } else {
            format!("{stem}_{attempt}")
        };
        let candidate = base_dir.join(name);
        match fs::create_dir(&candidate) {
            Ok(()) => {
                tracing::debug!(root = %candidate.display(), "created output tree");
                return Ok(candidate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(MaterializeError::TreeRoot {
                    path: candidate,
                    source,
                })
            }
        }
    }

    Err(MaterializeError::TreeRoot {
        path: base_dir.join(stem),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "too many runs with the same timestamp",
        ),
    })
}
