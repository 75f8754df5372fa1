//! Read-side document operations used when the editor page loads.

use crate::error::{QuillError, Result};
use crate::naming::split_extension;
use crate::workspace::{DEFAULT_DOCUMENT, Workspace, validate_resource_name};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::time::SystemTime;

/// Name created when the workspace has no Markdown files to open.
pub const UNTITLED_DOCUMENT: &str = "untitled.md";

/// Name created by the "new document" action.
pub const NEW_DOCUMENT: &str = "untitled.new";

/// A document's base name together with its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub content: Vec<u8>,
}

/// Read `index.md` from the workspace root.
pub fn load_index(workspace: &Workspace) -> Result<Document> {
    read_document(workspace, DEFAULT_DOCUMENT)
}

/// Open the most recently modified Markdown file, creating
/// [`UNTITLED_DOCUMENT`] if there is none.
pub fn open_latest(workspace: &Workspace) -> Result<Document> {
    let name = match latest_markdown(workspace)? {
        Some(name) => name,
        None => {
            create_blank(workspace, UNTITLED_DOCUMENT)?;
            UNTITLED_DOCUMENT.to_string()
        }
    };
    read_document(workspace, &name)
}

/// Create an empty document named `name` unless it already exists.
///
/// Returns true if the file was created by this call.
pub fn create_blank(workspace: &Workspace, name: &str) -> Result<bool> {
    validate_resource_name(name)?;
    let path = workspace.document_path(name);

    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => {
            tracing::info!(file = name, "created blank document");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(QuillError::Io(format!(
            "failed to create '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Base name of the newest `*.md` regular file in the root, if any.
fn latest_markdown(workspace: &Workspace) -> Result<Option<String>> {
    let entries = fs::read_dir(&workspace.root).map_err(|e| {
        QuillError::Io(format!(
            "failed to read directory '{}': {}",
            workspace.root.display(),
            e
        ))
    })?;

    let mut latest: Option<(SystemTime, String)> = None;
    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !split_extension(&name).1.eq_ignore_ascii_case(".md") {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        if latest.as_ref().is_none_or(|(newest, _)| modified > *newest) {
            latest = Some((modified, name));
        }
    }

    Ok(latest.map(|(_, name)| name))
}

fn read_document(workspace: &Workspace, name: &str) -> Result<Document> {
    let path = workspace.document_path(name);
    match fs::read(&path) {
        Ok(content) => Ok(Document {
            name: name.to_string(),
            content,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(QuillError::NotFound(name.to_string())),
        Err(e) => Err(QuillError::Io(format!(
            "failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}
