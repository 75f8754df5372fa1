//! Target-name decisions for saves and exports.

use super::{extract_title, slugify};
use crate::workspace::Workspace;

/// Names that are never renamed from their content.
const RESERVED_NAMES: [&str; 2] = ["index.md", "readme.md"];

/// Whether `name` is one of the reserved, never-retitled documents.
pub fn is_reserved(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_NAMES.contains(&lower.as_str())
}

/// Split a base name into stem and extension (including the dot).
///
/// The extension starts at the last `.`; a name without one has an empty
/// extension. A leading-dot name such as `.hidden` is all extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

/// Decide the name a save of `content` should be written under.
///
/// Returns `current` unchanged for reserved names, for documents without a
/// usable heading, and when the heading already matches the name. Otherwise
/// returns `{slug}.md`, which the caller must still pass through
/// [`make_unique`].
pub fn resolve_target(current: &str, content: &[u8]) -> String {
    if is_reserved(current) {
        return current.to_string();
    }

    let title = extract_title(&String::from_utf8_lossy(content));
    if title.is_empty() {
        return current.to_string();
    }

    let slug = slugify(&title);
    if slug.is_empty() {
        return current.to_string();
    }

    format!("{}.md", slug)
}

/// Return `desired` if no document has that name, else the first free
/// `{stem}-{n}{ext}` for n = 1, 2, 3, ...
pub fn make_unique(workspace: &Workspace, desired: &str) -> String {
    make_unique_for(workspace, desired, None)
}

/// Like [`make_unique`], but `current` (the document being saved) counts as free.
///
/// Saving `my-note-1.md` titled "My Note" while `my-note.md` exists keeps
/// its name instead of moving to `my-note-2.md`.
pub fn make_unique_for(workspace: &Workspace, desired: &str, current: Option<&str>) -> String {
    let is_free = |name: &str| current == Some(name) || !workspace.document_exists(name);

    if is_free(desired) {
        return desired.to_string();
    }

    let (stem, ext) = split_extension(desired);
    (1u64..)
        .map(|n| format!("{}-{}{}", stem, n, ext))
        .find(|candidate| is_free(candidate))
        .unwrap_or_else(|| desired.to_string())
}

/// Compute the HTML output name for a Markdown base name.
///
/// `readme.md` renders to `index.html` while the workspace has no `index.md`.
pub fn output_name_for(workspace: &Workspace, md_name: &str) -> String {
    if md_name.eq_ignore_ascii_case("readme.md") && !workspace.has_file_ignore_case("index.md") {
        return "index.html".to_string();
    }
    let (stem, _) = split_extension(md_name);
    format!("{}.html", stem)
}
