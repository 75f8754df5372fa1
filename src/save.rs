//! The save pipeline.
//!
//! A save moves through fixed stages:
//!
//! 1. **Validating**: the name must be a bare base name and the caller must
//!    hold the live lock on it.
//! 2. **Resolving**: the target name is derived from the document's first
//!    heading and made unique.
//! 3. **Writing**: the body replaces the target file. A renamed document is
//!    created exclusively, so it never replaces another document.
//! 4. **Cleanup** (renames only): the old document and its rendered page are
//!    deleted, and the lock follows the document to its new name.
//! 5. **Exporting** (when a converter is available): the target is rendered.
//!
//! Any stage up to Writing can fail the save. Cleanup and export failures are
//! logged and swallowed, since the document is already safely on disk.

use crate::error::{QuillError, Result};
use crate::export::{Exporter, remove_stale_output};
use crate::fs::{atomic_create, atomic_write};
use crate::locks::LockRegistry;
use crate::naming::{make_unique_for, resolve_target};
use crate::workspace::{Workspace, validate_resource_name};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound on collisions tolerated while claiming a rename target.
const MAX_CLAIM_ATTEMPTS: usize = 64;

/// Stage of a save, recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Validating,
    Resolving,
    Writing,
    Cleanup,
    Exporting,
    Done,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveStage::Validating => "validating",
            SaveStage::Resolving => "resolving",
            SaveStage::Writing => "writing",
            SaveStage::Cleanup => "cleanup",
            SaveStage::Exporting => "exporting",
            SaveStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Final base name of the document.
    pub name: String,

    /// The incoming name, if the document was renamed.
    pub renamed_from: Option<String>,

    /// Path of the rendered page, if export ran and succeeded.
    pub exported: Option<PathBuf>,
}

/// Composition of lock checks, naming, writing, and export.
#[derive(Debug, Clone)]
pub struct SavePipeline {
    workspace: Workspace,
    locks: Arc<LockRegistry>,
    exporter: Option<Exporter>,
}

impl SavePipeline {
    /// Create a pipeline. Pass `None` for `exporter` to disable export.
    pub fn new(workspace: Workspace, locks: Arc<LockRegistry>, exporter: Option<Exporter>) -> Self {
        Self {
            workspace,
            locks,
            exporter,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Save `body` as the document `name` on behalf of the holder of `token`.
    ///
    /// # Returns
    ///
    /// * `Ok(SaveOutcome)` - The document is on disk under `outcome.name`
    /// * `Err(QuillError::InvalidName)` - `name` has path components or is empty
    /// * `Err(QuillError::LockDenied)` - `token` does not own a live lock on `name`
    /// * `Err(QuillError::Io)` - The document could not be written
    pub fn save(&self, name: &str, body: &[u8], token: &str) -> Result<SaveOutcome> {
        trace_stage(name, SaveStage::Validating);
        validate_resource_name(name)?;
        if !self.locks.validate(name, token) {
            return Err(QuillError::LockDenied(name.to_string()));
        }

        trace_stage(name, SaveStage::Resolving);
        let desired = resolve_target(name, body);

        trace_stage(name, SaveStage::Writing);
        let target = if desired == name {
            atomic_write(self.workspace.document_path(name), body)?;
            desired
        } else {
            self.write_renamed(name, &desired, body)?
        };

        let renamed_from = if target != name {
            trace_stage(name, SaveStage::Cleanup);
            self.cleanup_after_rename(name, &target, token);
            Some(name.to_string())
        } else {
            None
        };

        let exported = match &self.exporter {
            Some(exporter) => {
                trace_stage(&target, SaveStage::Exporting);
                match exporter.export_document(&target) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        tracing::warn!(file = %target, error = %e, "export failed");
                        None
                    }
                }
            }
            None => None,
        };

        trace_stage(&target, SaveStage::Done);
        Ok(SaveOutcome {
            name: target,
            renamed_from,
            exported,
        })
    }

    /// Write `body` under a free variant of `desired` and return that name.
    ///
    /// A concurrent save may claim the same name between the existence check
    /// and the write, so the target is created exclusively and the next
    /// suffix is tried on collision.
    fn write_renamed(&self, name: &str, desired: &str, body: &[u8]) -> Result<String> {
        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let candidate = make_unique_for(&self.workspace, desired, Some(name));
            if candidate == name {
                atomic_write(self.workspace.document_path(name), body)?;
                return Ok(candidate);
            }
            if atomic_create(self.workspace.document_path(&candidate), body)? {
                return Ok(candidate);
            }
            tracing::debug!(file = name, target = %candidate, "rename target taken concurrently, retrying");
        }

        Err(QuillError::Io(format!(
            "could not claim a free name for '{}' after {} attempts",
            desired, MAX_CLAIM_ATTEMPTS
        )))
    }

    fn cleanup_after_rename(&self, old_name: &str, new_name: &str, token: &str) {
        let old_path = self.workspace.document_path(old_name);
        match fs::remove_file(&old_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %old_path.display(), error = %e, "failed to remove renamed document")
            }
        }

        remove_stale_output(&self.workspace, old_name);

        if !self.locks.transfer(old_name, new_name, token) {
            tracing::warn!(from = old_name, to = new_name, "lock expired before it could be transferred");
        }

        tracing::info!(from = old_name, to = new_name, "document renamed");
    }
}

fn trace_stage(file: &str, stage: SaveStage) {
    tracing::debug!(file, %stage, "save stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::locks::Acquisition;
    use tempfile::TempDir;

    fn pipeline(temp: &TempDir) -> SavePipeline {
        let ws = Workspace::resolve(temp.path(), &Config::default()).unwrap();
        SavePipeline::new(ws, Arc::new(LockRegistry::default()), None)
    }

    fn lock(pipeline: &SavePipeline, name: &str) -> String {
        match pipeline.locks().acquire(name, "") {
            Acquisition::Created(token) => token,
            other => panic!("expected a fresh lock on {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_save_in_place() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        let token = lock(&p, "index.md");

        let outcome = p.save("index.md", b"# Home\nwelcome", &token).unwrap();

        assert_eq!(outcome.name, "index.md");
        assert_eq!(outcome.renamed_from, None);
        assert_eq!(outcome.exported, None);
        assert_eq!(
            fs::read(temp.path().join("index.md")).unwrap(),
            b"# Home\nwelcome"
        );
    }

    #[test]
    fn test_save_renames_from_title() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        fs::write(temp.path().join("note.md"), "old").unwrap();
        let token = lock(&p, "note.md");

        let outcome = p.save("note.md", b"# My Note\nbody", &token).unwrap();

        assert_eq!(outcome.name, "my-note.md");
        assert_eq!(outcome.renamed_from.as_deref(), Some("note.md"));
        assert!(!temp.path().join("note.md").exists());
        assert_eq!(
            fs::read(temp.path().join("my-note.md")).unwrap(),
            b"# My Note\nbody"
        );
    }

    #[test]
    fn test_save_rename_transfers_lock() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        let token = lock(&p, "note.md");

        p.save("note.md", b"# My Note\n", &token).unwrap();

        assert!(!p.locks().validate("note.md", &token));
        assert!(p.locks().validate("my-note.md", &token));

        // The same client keeps saving under the new name.
        let again = p.save("my-note.md", b"# My Note\nmore", &token).unwrap();
        assert_eq!(again.name, "my-note.md");
        assert_eq!(again.renamed_from, None);
    }

    #[test]
    fn test_save_rename_avoids_collision() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        fs::write(temp.path().join("my-note.md"), "someone else's note").unwrap();
        let token = lock(&p, "note.md");

        let outcome = p.save("note.md", b"# My Note\n", &token).unwrap();

        assert_eq!(outcome.name, "my-note-1.md");
        assert_eq!(
            fs::read_to_string(temp.path().join("my-note.md")).unwrap(),
            "someone else's note"
        );
    }

    #[test]
    fn test_save_suffixed_name_is_stable() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        fs::write(temp.path().join("my-note.md"), "someone else's note").unwrap();
        let token = lock(&p, "note.md");

        let first = p.save("note.md", b"# My Note\n", &token).unwrap();
        let second = p.save(&first.name, b"# My Note\nedited", &token).unwrap();

        assert_eq!(second.name, "my-note-1.md");
        assert_eq!(second.renamed_from, None);
    }

    #[test]
    fn test_concurrent_renames_to_same_title_keep_both_documents() {
        use std::sync::Barrier;
        use std::thread;

        for _ in 0..50 {
            let temp = TempDir::new().unwrap();
            let ws = Workspace::resolve(temp.path(), &Config::default()).unwrap();
            let locks = LockRegistry::new(std::time::Duration::from_secs(60));
            let p = SavePipeline::new(ws, Arc::new(locks), None);
            let token_a = lock(&p, "a.md");
            let token_b = lock(&p, "b.md");
            let barrier = Arc::new(Barrier::new(2));

            let spawn_save = |name: &'static str, body: &'static [u8], token: String| {
                let p = p.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    p.save(name, body, &token).unwrap()
                })
            };
            let first = spawn_save("a.md", b"# Same\nA", token_a.clone());
            let second = spawn_save("b.md", b"# Same\nB", token_b.clone());
            let first = first.join().unwrap();
            let second = second.join().unwrap();

            assert_ne!(first.name, second.name);
            let mut names = vec![first.name.clone(), second.name.clone()];
            names.sort();
            assert_eq!(names, vec!["same-1.md".to_string(), "same.md".to_string()]);

            assert_eq!(fs::read(temp.path().join(&first.name)).unwrap(), b"# Same\nA");
            assert_eq!(fs::read(temp.path().join(&second.name)).unwrap(), b"# Same\nB");

            // Each client owns the lock on its own document.
            assert!(p.locks().validate(&first.name, &token_a));
            assert!(p.locks().validate(&second.name, &token_b));
        }
    }

    #[test]
    fn test_save_reserved_name_never_renamed() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        let token = lock(&p, "README.md");

        let outcome = p.save("README.md", b"# Project Title\n", &token).unwrap();
        assert_eq!(outcome.name, "README.md");
    }

    #[test]
    fn test_save_rename_removes_stale_output() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        let ws = p.workspace().clone();
        fs::create_dir_all(&ws.output_dir).unwrap();
        fs::write(ws.output_path("note.html"), "stale").unwrap();
        let token = lock(&p, "note.md");

        p.save("note.md", b"# Fresh Title\n", &token).unwrap();

        assert!(!ws.output_path("note.html").exists());
    }

    #[test]
    fn test_save_without_lock_is_denied() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);

        let err = p.save("note.md", b"body", "made-up").unwrap_err();

        assert!(matches!(err, QuillError::LockDenied(_)));
        assert!(!temp.path().join("note.md").exists());
    }

    #[test]
    fn test_save_with_foreign_token_is_denied() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        let _owner = lock(&p, "note.md");

        let err = p.save("note.md", b"body", "intruder").unwrap_err();
        assert!(matches!(err, QuillError::LockDenied(_)));
    }

    #[test]
    fn test_stale_token_after_rename_is_denied() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        let token = lock(&p, "note.md");

        p.save("note.md", b"# My Note\nbody", &token).unwrap();

        let err = p.save("note.md", b"# My Note\nbody", &token).unwrap_err();
        assert!(matches!(err, QuillError::LockDenied(_)));
    }

    #[test]
    fn test_save_rejects_path_traversal() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);

        for name in ["../escape.md", "sub/dir.md", "", ".."] {
            let err = p.save(name, b"x", "token").unwrap_err();
            assert!(
                matches!(err, QuillError::InvalidName(_)),
                "'{}' gave {:?}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_save_write_failure_is_io_error() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        // A directory occupying the target name cannot be replaced by a file.
        fs::create_dir(temp.path().join("index.md")).unwrap();
        fs::write(temp.path().join("index.md").join("keep"), "x").unwrap();
        let token = lock(&p, "index.md");

        let err = p.save("index.md", b"body", &token).unwrap_err();
        assert!(matches!(err, QuillError::Io(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_exports_when_converter_present() {
        use crate::export::{Converter, find_executable};

        let temp = TempDir::new().unwrap();
        let ws = Workspace::resolve(temp.path(), &Config::default()).unwrap();
        let cat = find_executable("cat").unwrap();
        let exporter = Exporter::new(Converter::new(cat, vec![], None), ws.clone());
        let p = SavePipeline::new(ws.clone(), Arc::new(LockRegistry::default()), Some(exporter));
        let token = lock(&p, "note.md");

        let outcome = p.save("note.md", b"# My Note\nbody", &token).unwrap();

        assert_eq!(outcome.exported, Some(ws.output_path("my-note.html")));
        assert_eq!(
            fs::read_to_string(ws.output_path("my-note.html")).unwrap(),
            "# My Note\nbody"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_save_succeeds_when_export_fails() {
        use crate::export::{Converter, find_executable};

        let temp = TempDir::new().unwrap();
        let ws = Workspace::resolve(temp.path(), &Config::default()).unwrap();
        let failing = find_executable("false").unwrap();
        let exporter = Exporter::new(Converter::new(failing, vec![], None), ws.clone());
        let p = SavePipeline::new(ws, Arc::new(LockRegistry::default()), Some(exporter));
        let token = lock(&p, "index.md");

        let outcome = p.save("index.md", b"body", &token).unwrap();

        assert_eq!(outcome.name, "index.md");
        assert_eq!(outcome.exported, None);
        assert_eq!(fs::read(temp.path().join("index.md")).unwrap(), b"body");
    }

    #[test]
    fn test_save_stage_display() {
        assert_eq!(SaveStage::Validating.to_string(), "validating");
        assert_eq!(SaveStage::Done.to_string(), "done");
    }
}
