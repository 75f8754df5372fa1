//! HTML export of saved documents.
//!
//! After every save the document is rendered by the external converter and
//! written to the output directory as `header.html ++ body ++ footer.html`.
//! Fragments come from the includes directory; a missing fragment simply
//! contributes nothing.
//!
//! Export is advisory: its failures are reported to the caller of
//! [`Exporter::export`] but the save pipeline only logs them.

mod converter;
mod includes;

pub use converter::{Converter, find_executable};
pub use includes::copy_includes;

use crate::error::{QuillError, Result};
use crate::fs::atomic_write;
use crate::naming::{output_name_for, split_extension};
use crate::workspace::Workspace;
use std::fs;
use std::path::{Path, PathBuf};

/// Fragment prepended to every exported page.
pub const HEADER_FRAGMENT: &str = "header.html";

/// Fragment appended to every exported page.
pub const FOOTER_FRAGMENT: &str = "footer.html";

/// Renders documents from a workspace into its output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    converter: Converter,
    workspace: Workspace,
}

impl Exporter {
    pub fn new(converter: Converter, workspace: Workspace) -> Self {
        Self {
            converter,
            workspace,
        }
    }

    /// Render the document `name` to its output file and return that path.
    pub fn export_document(&self, name: &str) -> Result<PathBuf> {
        let source = self.workspace.document_path(name);
        let output = self
            .workspace
            .output_path(&output_name_for(&self.workspace, name));
        self.export(&source, &output)?;
        Ok(output)
    }

    /// Render `source` to `output`.
    ///
    /// Sources without a `.md` extension (case-insensitive) are skipped.
    pub fn export(&self, source: &Path, output: &Path) -> Result<()> {
        let is_markdown = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| split_extension(n).1.eq_ignore_ascii_case(".md"))
            .unwrap_or(false);
        if !is_markdown {
            return Ok(());
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                QuillError::Export(format!(
                    "failed to create output directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let body = self.converter.render(source)?;
        let header = read_fragment(&self.workspace.includes_dir.join(HEADER_FRAGMENT))?;
        let footer = read_fragment(&self.workspace.includes_dir.join(FOOTER_FRAGMENT))?;

        let mut page = Vec::with_capacity(header.len() + body.len() + footer.len());
        page.extend_from_slice(&header);
        page.extend_from_slice(&body);
        page.extend_from_slice(&footer);

        atomic_write(output, &page).map_err(|e| QuillError::Export(e.to_string()))
    }
}

/// Read a wrapping fragment; a missing file yields no bytes.
fn read_fragment(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(QuillError::Export(format!(
            "failed to read fragment '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Delete the rendered output of a document that was renamed away from `old_name`.
///
/// Best-effort: a leftover page is preferable to failing a save that already
/// succeeded, so errors are only logged.
pub fn remove_stale_output(workspace: &Workspace, old_name: &str) {
    let stale = workspace.output_path(&output_name_for(workspace, old_name));
    match fs::remove_file(&stale) {
        Ok(()) => tracing::debug!(path = %stale.display(), "removed stale output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %stale.display(), error = %e, "failed to remove stale output"),
    }
}
