//! External Markdown-to-HTML converter.
//!
//! The converter is any executable that takes a Markdown file path as its
//! last argument and prints HTML on stdout (`cmark-gfm` by default). It is
//! located once at startup; every save then runs it as an independent child
//! process.

use crate::error::{QuillError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a bounded run checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A located converter executable plus its fixed arguments.
#[derive(Debug, Clone)]
pub struct Converter {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl Converter {
    /// Create a converter for a known executable path.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Locate the converter named by a command line such as `cmark-gfm --unsafe`.
    ///
    /// Returns `None` if the command cannot be split or its program is not an
    /// executable on `PATH` (or at the given path).
    pub fn discover(command: &str, timeout: Option<Duration>) -> Option<Self> {
        let mut words = shell_words::split(command).ok()?.into_iter();
        let program = words.next()?;
        let resolved = find_executable(&program)?;
        Some(Self::new(resolved, words.collect(), timeout))
    }

    /// Path of the converter executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the converter on `source` and return its stdout.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - The HTML body on exit code 0
    /// * `Err(QuillError::Export)` - Spawn failure, non-zero exit, or timeout
    pub fn render(&self, source: &Path) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                QuillError::Export(format!(
                    "failed to execute {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we wait for it.
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = self.wait(&mut child)?;
        let body = stdout.join().unwrap_or_default();
        let errors = stderr.join().unwrap_or_default();

        if status.success() {
            Ok(body)
        } else {
            let code = status.code().unwrap_or(-1);
            Err(QuillError::Export(format!(
                "{} failed on '{}' (exit code {}): {}",
                self.program.display(),
                source.display(),
                code,
                String::from_utf8_lossy(&errors).trim()
            )))
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let wait_error = |e: std::io::Error| {
            QuillError::Export(format!(
                "failed to wait for {}: {}",
                self.program.display(),
                e
            ))
        };

        let Some(limit) = self.timeout else {
            return child.wait().map_err(wait_error);
        };

        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(QuillError::Export(format!(
                    "{} timed out after {:?}",
                    self.program.display(),
                    limit
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Resolve `program` to an executable file.
///
/// Names containing a path separator are checked directly; bare names are
/// searched for on `PATH` (honoring `PATHEXT` on Windows).
pub fn find_executable(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
