use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".remold.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Backup beside the target, target overwritten, modules under `utils/`.
    #[default]
    InPlace,
    /// Fresh `<label>_<stamp>/{before,after,utils}` tree.
    TimestampedTree,
}

/// Where the backup (or `before/` copy) comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackupPolicy {
    /// Always the caller's original source. Payload `backup_content` is
    /// never used as the recovery copy.
    #[default]
    #[serde(alias = "synthesize")]
    Original,
    /// Only the payload's `backup_content`; skipped when absent. Opt-in:
    /// the backup is then agent text, not the file as it was on disk.
    PayloadOnly,
    /// Never write a backup.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoldConfig {
    pub preview_only: bool,
    pub confirm: bool,
    pub layout: LayoutKind,
    pub backup_policy: BackupPolicy,
    pub log_dir: PathBuf,
    pub tree_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_command: Option<String>,
    pub excerpt_len: usize,
}

impl Default for RemoldConfig {
    fn default() -> Self {
        Self {
            preview_only: false,
            confirm: true,
            layout: LayoutKind::InPlace,
            backup_policy: BackupPolicy::Original,
            log_dir: PathBuf::from("refactor_logs"),
            tree_label: "refactor_output".into(),
            output_dir: None,
            agent_command: None,
            excerpt_len: 200,
        }
    }
}

/// A tree label becomes one directory name, so it may not be empty, name a
/// parent or current directory, or carry a path separator.
pub fn check_tree_label(label: &str) -> Result<(), CoreError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Config("tree_label must not be empty".into()));
    }
    if trimmed == "."
        || trimmed == ".."
        || label.contains(['/', '\\'])
        || label.chars().any(char::is_control)
    {
        return Err(CoreError::Config(format!(
            "tree_label '{label}' must be a single directory name"
        )));
    }
    Ok(())
}

impl RemoldConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        check_tree_label(&config.tree_label)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        let config = RemoldConfig {
            preview_only: true,
            layout: LayoutKind::TimestampedTree,
            backup_policy: BackupPolicy::PayloadOnly,
            agent_command: Some("my-agent --json".into()),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RemoldConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"layout": "timestamped_tree"}"#).unwrap();
        let config = RemoldConfig::load(&path).unwrap();
        assert_eq!(config.layout, LayoutKind::TimestampedTree);
        assert_eq!(config.backup_policy, BackupPolicy::Original);
        assert_eq!(config.log_dir, PathBuf::from("refactor_logs"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = RemoldConfig::load_or_default(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(config, RemoldConfig::default());
    }

    #[test]
    fn test_empty_label_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"tree_label": "  "}"#).unwrap();
        assert!(matches!(
            RemoldConfig::load(&path),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_label_with_path_rejected() {
        for label in ["../../x", "a/b", "a\\b", "..", "."] {
            assert!(
                matches!(check_tree_label(label), Err(CoreError::Config(_))),
                "{label} accepted"
            );
        }
        assert!(check_tree_label("refactor_output").is_ok());
        assert!(check_tree_label("v1..2").is_ok());

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"tree_label": "../escape"}"#).unwrap();
        assert!(matches!(
            RemoldConfig::load(&path),
            Err(CoreError::Config(_))
        ));
    }
}
