//! Atomic file replacement.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! [`atomic_create`] differs only in the last step: the temp file is
//! hard-linked to the target, which fails if the target already exists.
//!
//! The temporary file is named `.{filename}.{random}.tmp`, so concurrent
//! writers of the same target never share a temp file. On crash a temp file
//! may remain.

use crate::error::{QuillError, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Atomically write bytes to a file, creating parent directories as needed.
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(QuillError::Io)` - On write or rename failure
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            QuillError::Io(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// Atomically create `path` with `content`, never replacing an existing file.
///
/// # Returns
///
/// * `Ok(true)` - The file was created with the full content
/// * `Ok(false)` - Something already exists at `path`; it is left untouched
/// * `Err(QuillError::Io)` - On write or link failure
pub fn atomic_create<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<bool> {
    let path = path.as_ref();
    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);
    match linked {
        Ok(()) => {
            sync_parent_dir(path);
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

/// Generate a temporary file path in the same directory as the target.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| QuillError::Io(format!("invalid file path '{}'", target.display())))?;

    let temp_name = format!(".{}.{}.tmp", filename, Uuid::new_v4().simple());
    Ok(parent.join(temp_name))
}

/// Write content to a file and sync to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        QuillError::Io(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        QuillError::Io(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        QuillError::Io(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Rename `source` over `target`, replacing it if present.
fn replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        QuillError::Io(format!(
            "failed to write '{}': {}",
            target.display(),
            e
        ))
    })?;

    sync_parent_dir(target);
    Ok(())
}

/// Persist the directory entry of `target` (best-effort).
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("note.md");

        atomic_write(&file_path, b"# Note\n").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "# Note\n");
    }

    #[test]
    fn test_atomic_write_replace_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("note.md");
        fs::write(&file_path, "original content").unwrap();

        atomic_write(&file_path, b"new content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("docs").join("nested").join("page.html");

        atomic_write(&file_path, b"<p>hi</p>").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("note.md");

        atomic_write(&file_path, b"content").unwrap();
        atomic_write(&file_path, b"content again").unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["note.md".to_string()]);
    }

    #[test]
    fn test_atomic_write_empty_and_binary_content() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty.md");
        let binary = temp_dir.path().join("binary.bin");
        let bytes: Vec<u8> = (0..=255).collect();

        atomic_write(&empty, b"").unwrap();
        atomic_write(&binary, &bytes).unwrap();

        assert!(fs::read(&empty).unwrap().is_empty());
        assert_eq!(fs::read(&binary).unwrap(), bytes);
    }

    #[test]
    fn test_generate_temp_path_is_hidden_sibling() {
        let target = Path::new("/some/path/note.md");
        let first = generate_temp_path(target).unwrap();
        let second = generate_temp_path(target).unwrap();

        assert_eq!(first.parent().unwrap(), Path::new("/some/path"));
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".note.md."));
        assert!(name.ends_with(".tmp"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_atomic_write_concurrent_same_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.md");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || atomic_write(&path, format!("writer {}", i).as_bytes()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("writer "));
    }

    #[test]
    fn test_atomic_create_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("fresh.md");

        assert!(atomic_create(&file_path, b"# Fresh\n").unwrap());

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "# Fresh\n");
        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["fresh.md".to_string()]);
    }

    #[test]
    fn test_atomic_create_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("taken.md");
        fs::write(&file_path, "first").unwrap();

        assert!(!atomic_create(&file_path, b"second").unwrap());

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "first");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_create_concurrent_single_winner() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contested.md");
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    atomic_create(&path, format!("writer {}", i).as_bytes()).unwrap()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|created| *created)
            .count();

        assert_eq!(winners, 1);
        assert!(fs::read_to_string(&path).unwrap().starts_with("writer "));
    }
}
