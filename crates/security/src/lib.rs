//! # Offload Security
//!
//! Path confinement for the offload substrate. Every file the core opens
//! must first pass through [`AllowedRoots::validate`], which yields a
//! [`ValidatedPath`] — the proof token that a path is absolute, normalized,
//! and contained under one of the allow-listed roots.
//!
//! Validation is purely lexical: `.` and `..` segments are resolved without
//! touching the filesystem, so a missing file still validates (or fails)
//! deterministically. Symlink handling is a discovery-time concern, not a
//! validation-time one.

use offload_protocol::ErrorCode;
use std::fmt;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PathSecurityError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSecurityError {
    #[error("path is not absolute: {0}")]
    NotAbsolute(PathBuf),

    #[error("path escapes the allowed roots via traversal: {0}")]
    TraversalDetected(PathBuf),

    #[error("path is outside the allowed roots: {0}")]
    OutsideAllowedRoots(PathBuf),

    #[error("path contains control characters")]
    ControlCharacters,
}

impl PathSecurityError {
    /// Taxonomy code for the result envelope. Control characters are
    /// reported as traversal: they only appear in smuggling attempts.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotAbsolute(_) => ErrorCode::NotAbsolute,
            Self::TraversalDetected(_) | Self::ControlCharacters => ErrorCode::TraversalDetected,
            Self::OutsideAllowedRoots(_) => ErrorCode::OutsideAllowedRoots,
        }
    }
}

/// An absolute, normalized path proven to lie under an allowed root.
///
/// Only constructible through [`AllowedRoots::validate`] (or
/// [`ValidatedPath::join_under`], which cannot leave the subtree).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath {
    inner: PathBuf,
}

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.inner
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.inner
    }

    /// Append a relative path that cannot traverse upward.
    ///
    /// Used by discovery to mint validated children from walk entries
    /// without re-running containment checks per file.
    pub fn join_under(&self, relative: &Path) -> Result<ValidatedPath> {
        if relative.is_absolute() {
            return Err(PathSecurityError::TraversalDetected(relative.to_path_buf()));
        }
        let mut joined = self.inner.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => joined.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(PathSecurityError::TraversalDetected(relative.to_path_buf()));
                }
            }
        }
        Ok(ValidatedPath { inner: joined })
    }
}

impl Deref for ValidatedPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.inner
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.inner
    }
}

impl fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.display().fmt(f)
    }
}

/// Immutable set of absolute directory prefixes, built once at startup.
#[derive(Debug, Clone)]
pub struct AllowedRoots {
    roots: Vec<PathBuf>,
}

impl AllowedRoots {
    /// Build the root set. Every root must be absolute; roots are
    /// normalized the same way validated paths are.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let mut normalized = Vec::new();
        for root in roots {
            if !root.is_absolute() {
                return Err(PathSecurityError::NotAbsolute(root));
            }
            let clean = normalize_lexically(&root)?;
            if !normalized.contains(&clean) {
                normalized.push(clean);
            }
        }
        Ok(Self { roots: normalized })
    }

    /// Read roots from a path-list environment variable
    /// (e.g. `OFFLOAD_ALLOWED_ROOTS=/work/project:/tmp/scratch`).
    ///
    /// A missing or empty variable yields an empty (deny-all) set.
    pub fn from_env(var: &str) -> Result<Self> {
        let Some(raw) = std::env::var_os(var) else {
            log::warn!("{var} is not set; all file access will be rejected");
            return Self::new([]);
        };
        Self::new(std::env::split_paths(&raw).filter(|p| !p.as_os_str().is_empty()))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Validate a raw path against the root set.
    ///
    /// Rejects relative paths, control characters, and anything whose
    /// normalized form lies outside every root. A path that looks contained
    /// before normalization but escapes after (`/allowed/../etc`) is
    /// reported as [`PathSecurityError::TraversalDetected`] rather than
    /// merely outside.
    pub fn validate(&self, raw: impl AsRef<Path>) -> Result<ValidatedPath> {
        let raw = raw.as_ref();
        if has_control_characters(raw) {
            return Err(PathSecurityError::ControlCharacters);
        }
        if !raw.is_absolute() {
            return Err(PathSecurityError::NotAbsolute(raw.to_path_buf()));
        }

        let normalized = normalize_lexically(raw)?;
        if self.roots.iter().any(|root| normalized.starts_with(root)) {
            return Ok(ValidatedPath { inner: normalized });
        }

        // A naive prefix check on the raw path would have accepted this one;
        // normalization revealed the escape.
        let naively_contained = self.roots.iter().any(|root| raw.starts_with(root));
        if naively_contained {
            Err(PathSecurityError::TraversalDetected(raw.to_path_buf()))
        } else {
            Err(PathSecurityError::OutsideAllowedRoots(raw.to_path_buf()))
        }
    }
}

fn has_control_characters(path: &Path) -> bool {
    path.to_string_lossy().chars().any(char::is_control)
}

/// Resolve `.` and `..` without touching the filesystem. `..` above the
/// filesystem root is an escape attempt.
fn normalize_lexically(path: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() || out.as_os_str().is_empty() {
                    return Err(PathSecurityError::TraversalDetected(path.to_path_buf()));
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Ok(out)
}
