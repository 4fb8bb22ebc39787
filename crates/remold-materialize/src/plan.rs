use std::collections::HashSet;
use std::path::{Path, PathBuf};

use remold_core::config::{BackupPolicy, LayoutKind};
use remold_core::model::{FileOutcome, FileRole, FileStatus, RefactorResult};

use crate::error::MaterializeError;
use crate::sanitize::{sanitize, Nesting, PathRejection};

pub const BACKUP_SUFFIX: &str = "backup";
pub const BEFORE_DIR: &str = "before";
pub const AFTER_DIR: &str = "after";
pub const UTILS_DIR: &str = "utils";

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub role: FileRole,
    pub logical_name: Option<String>,
    pub path: PathBuf,
    pub content: String,
}

impl PlannedFile {
    pub fn outcome(&self, status: FileStatus) -> FileOutcome {
        FileOutcome {
            role: self.role,
            logical_name: self.logical_name.clone(),
            path: Some(self.path.clone()),
            status,
        }
    }
}

/// A file to write, or the reason it will not be written.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Write(PlannedFile),
    Skip(FileOutcome),
}

/// Every destination for one run, with traversal and collision checks
/// already applied. Recomputed per run, never persisted.
#[derive(Debug, Clone)]
pub struct MaterializationPlan {
    pub root: PathBuf,
    pub layout: LayoutKind,
    pub utils_dir: PathBuf,
    pub backup: Step,
    pub primary: PlannedFile,
    pub utilities: Vec<Step>,
}

impl MaterializationPlan {
    /// Backup beside `target`, `target` rewritten, modules flattened into
    /// `<target dir>/utils`.
    pub fn in_place(
        result: &RefactorResult,
        target: &Path,
        original_source: &str,
        policy: BackupPolicy,
    ) -> Result<Self, MaterializeError> {
        let root = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            Some(_) => PathBuf::from("."),
            None => {
                return Err(MaterializeError::InvalidTarget(
                    target.display().to_string(),
                ))
            }
        };
        if target.file_name().is_none() {
            return Err(MaterializeError::InvalidTarget(
                target.display().to_string(),
            ));
        }

        let utils_dir = root.join(UTILS_DIR);
        let backup = backup_step(result, original_source, policy, backup_path(target));
        let primary = PlannedFile {
            role: FileRole::Primary,
            logical_name: None,
            path: target.to_path_buf(),
            content: result.primary_content.clone(),
        };
        let utilities = utility_steps(result, &utils_dir, Nesting::Flatten, &backup, &primary);

        Ok(Self {
            root,
            layout: LayoutKind::InPlace,
            utils_dir,
            backup,
            primary,
            utilities,
        })
    }

    /// `before/<file_name>`, `after/<file_name>` and `utils/<logical_name>`
    /// under an already-created `tree_root`.
    pub fn tree(
        result: &RefactorResult,
        tree_root: &Path,
        file_name: &str,
        original_source: &str,
        policy: BackupPolicy,
    ) -> Self {
        let utils_dir = tree_root.join(UTILS_DIR);
        let backup = backup_step(
            result,
            original_source,
            policy,
            tree_root.join(BEFORE_DIR).join(file_name),
        );
        let primary = PlannedFile {
            role: FileRole::Primary,
            logical_name: None,
            path: tree_root.join(AFTER_DIR).join(file_name),
            content: result.primary_content.clone(),
        };
        let utilities = utility_steps(result, &utils_dir, Nesting::Preserve, &backup, &primary);

        Self {
            root: tree_root.to_path_buf(),
            layout: LayoutKind::TimestampedTree,
            utils_dir,
            backup,
            primary,
            utilities,
        }
    }

    /// Paths that will actually be written.
    pub fn destinations(&self) -> Vec<&Path> {
        std::iter::once(&self.backup)
            .chain(self.utilities.iter())
            .filter_map(|s| match s {
                Step::Write(f) => Some(f.path.as_path()),
                Step::Skip(_) => None,
            })
            .chain(std::iter::once(self.primary.path.as_path()))
            .collect()
    }
}

/// `main.py` -> `main.py.backup`.
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    target.with_file_name(name)
}

fn backup_step(
    result: &RefactorResult,
    original_source: &str,
    policy: BackupPolicy,
    path: PathBuf,
) -> Step {
    let content = match policy {
        BackupPolicy::Disabled => None,
        BackupPolicy::PayloadOnly => result.backup_content.clone(),
        BackupPolicy::Original => Some(original_source.to_string()),
    };
    match content {
        Some(content) => Step::Write(PlannedFile {
            role: FileRole::Backup,
            logical_name: None,
            path,
            content,
        }),
        None => {
            let reason = match policy {
                BackupPolicy::Disabled => "backups disabled",
                _ => "payload carried no backup content",
            };
            Step::Skip(FileOutcome {
                role: FileRole::Backup,
                logical_name: None,
                path: Some(path),
                status: FileStatus::Skipped {
                    reason: reason.into(),
                },
            })
        }
    }
}

fn utility_steps(
    result: &RefactorResult,
    utils_dir: &Path,
    nesting: Nesting,
    backup: &Step,
    primary: &PlannedFile,
) -> Vec<Step> {
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    claimed.insert(primary.path.clone());
    if let Step::Write(f) = backup {
        claimed.insert(f.path.clone());
    }

    result
        .utility_modules
        .iter()
        .map(|(name, content)| {
            let resolved = sanitize(name, utils_dir, nesting).and_then(|safe| {
                let path = safe.into_path_buf();
                if claimed.insert(path.clone()) {
                    Ok(path)
                } else {
                    Err(PathRejection::Collision {
                        name: name.clone(),
                        path,
                    })
                }
            });
            match resolved {
                Ok(path) => Step::Write(PlannedFile {
                    role: FileRole::Utility,
                    logical_name: Some(name.clone()),
                    path,
                    content: content.clone(),
                }),
                Err(rejection) => {
                    tracing::warn!(name = %name, %rejection, "utility module rejected");
                    Step::Skip(FileOutcome {
                        role: FileRole::Utility,
                        logical_name: Some(name.clone()),
                        path: None,
                        status: FileStatus::Rejected {
                            reason: rejection.to_string(),
                        },
                    })
                }
            }
        })
        .collect()
}
