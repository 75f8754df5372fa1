//! Static include copying.
//!
//! Everything under the includes directory (stylesheets, images, the
//! header/footer fragments) is mirrored into the output directory once at
//! startup so exported pages can reference it.

use crate::error::{QuillError, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy `src_dir` into `dst_dir`.
///
/// A missing `src_dir`, or one that is not a directory, is a no-op.
/// Returns the number of files copied.
pub fn copy_includes(src_dir: &Path, dst_dir: &Path) -> Result<usize> {
    match fs::metadata(src_dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(QuillError::Io(format!(
                "failed to read includes directory '{}': {}",
                src_dir.display(),
                e
            )));
        }
    }

    create_dir(dst_dir)?;
    copy_tree(src_dir, dst_dir)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            QuillError::Io(format!("failed to walk '{}': {}", src.display(), e))
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|e| {
            QuillError::Io(format!("failed to walk '{}': {}", src.display(), e))
        })?;
        let dst_path = dst.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&dst_path)?;
            continue;
        }

        // fs::copy carries the permission bits over.
        fs::copy(entry.path(), &dst_path).map_err(|e| {
            QuillError::Io(format!(
                "failed to copy '{}' to '{}': {}",
                entry.path().display(),
                dst_path.display(),
                e
            ))
        })?;
        copied += 1;
    }

    Ok(copied)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        QuillError::Io(format!(
            "failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}
