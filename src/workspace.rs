//! Directory layout for a quill session.
//!
//! Markdown documents live as flat files in the root directory. Rendered HTML
//! goes to a sibling output directory (default `docs/`), and optional wrapping
//! fragments and static assets are read from an includes directory (default
//! `_includes/`).
//!
//! All document-facing operations take a *resource name*: a bare base name
//! with no directory components. [`Workspace::document_path`] is the only way
//! such a name is turned into a path.

use crate::config::Config;
use crate::error::{QuillError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name used when a save request does not name its file.
pub const DEFAULT_DOCUMENT: &str = "index.md";

/// Resolved paths for a quill session. All paths are absolute.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory holding the Markdown documents.
    pub root: PathBuf,

    /// Directory receiving rendered HTML (default: `{root}/docs/`).
    pub output_dir: PathBuf,

    /// Directory holding `header.html`, `footer.html`, and static assets
    /// (default: `{root}/_includes/`).
    pub includes_dir: PathBuf,
}

impl Workspace {
    /// Resolve the layout under `root` using the directory names from `config`.
    pub fn resolve<P: AsRef<Path>>(root: P, config: &Config) -> Result<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|e| {
            QuillError::Io(format!(
                "failed to resolve working directory '{}': {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            output_dir: root.join(&config.output_dir),
            includes_dir: root.join(&config.includes_dir),
            root,
        })
    }

    /// Absolute path of the document with the given resource name.
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Absolute path of a rendered output file.
    pub fn output_path(&self, html_name: &str) -> PathBuf {
        self.output_dir.join(html_name)
    }

    /// Whether a document with exactly this name exists.
    pub fn document_exists(&self, name: &str) -> bool {
        self.document_path(name).exists()
    }

    /// Whether a regular file matching `name` case-insensitively exists in the root.
    pub fn has_file_ignore_case(&self, name: &str) -> bool {
        let want = name.to_lowercase();
        let Ok(entries) = fs::read_dir(&self.root) else {
            return false;
        };
        entries.flatten().any(|entry| {
            entry.file_type().map(|t| !t.is_dir()).unwrap_or(false)
                && entry.file_name().to_string_lossy().to_lowercase() == want
        })
    }
}

/// Check that `name` is a bare base name safe to join onto the root.
///
/// Rejects empty names, `.`, `..`, and anything containing a path separator.
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(QuillError::InvalidName("missing file name".to_string()));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(QuillError::InvalidName(name.to_string()));
    }
    Ok(())
}
