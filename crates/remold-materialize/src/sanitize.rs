//! Turn untrusted logical module names into paths that stay under a root.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Leading segment agents use to signal "this is a utility module".
pub const NAMESPACE_HINT: &str = "utils";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("empty logical name")]
    Empty,

    #[error("absolute path not allowed: {0}")]
    Absolute(String),

    #[error("parent-directory traversal not allowed: {0}")]
    Traversal(String),

    #[error("control or NUL character in name: {0:?}")]
    InvalidCharacter(String),

    #[error("resolves outside the output root: {0}")]
    EscapesRoot(String),

    #[error("{name} collides with another file at {}", path.display())]
    Collision { name: String, path: PathBuf },
}

/// How nested logical names (`pkg/io.py`) are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// Keep only the final component.
    Flatten,
    /// Keep the directory structure under the root.
    Preserve,
}

/// A destination guaranteed to be a descendant of its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePath {
    relative: PathBuf,
    absolute: PathBuf,
}

impl SafePath {
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.absolute
    }
}

pub fn sanitize(logical_name: &str, root: &Path, nesting: Nesting) -> Result<SafePath, PathRejection> {
    let original = logical_name.to_string();
    let normalized = logical_name.replace('\\', "/");
    let trimmed = normalized.trim();

    if trimmed.chars().any(char::is_control) {
        return Err(PathRejection::InvalidCharacter(original));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('~') || has_drive_prefix(trimmed) {
        return Err(PathRejection::Absolute(original));
    }

    let mut segments: Vec<&str> = trimmed
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.first() == Some(&NAMESPACE_HINT) {
        segments.remove(0);
    }
    if segments.iter().any(|s| *s == "..") {
        return Err(PathRejection::Traversal(original));
    }

    let relative: PathBuf = match nesting {
        Nesting::Flatten => segments.last().map(|s| PathBuf::from(*s)).ok_or(PathRejection::Empty)?,
        Nesting::Preserve if segments.is_empty() => return Err(PathRejection::Empty),
        Nesting::Preserve => segments.iter().collect(),
    };

    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(PathRejection::EscapesRoot(original));
    }

    let absolute = root.join(&relative);
    if !absolute.starts_with(root) || escapes_via_symlink(root, &absolute) {
        return Err(PathRejection::EscapesRoot(original));
    }

    tracing::trace!(name = logical_name, path = %absolute.display(), "sanitized");
    Ok(SafePath { relative, absolute })
}

/// `C:` style prefixes.
fn has_drive_prefix(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(c), Some(':')) if c.is_ascii_alphabetic())
}

/// True when an already-existing ancestor of `dest` resolves outside `root`,
/// e.g. through a symlinked directory.
fn escapes_via_symlink(root: &Path, dest: &Path) -> bool {
    let Ok(real_root) = root.canonicalize() else {
        return false;
    };
    dest.ancestors()
        .filter(|a| a.starts_with(root) && a.exists())
        .filter_map(|a| a.canonicalize().ok())
        .any(|real| !real.starts_with(&real_root))
}
