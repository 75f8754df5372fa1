//! Configuration model for quill.
//!
//! Settings come from an optional `.quill.yaml` in the working directory.
//! Unknown fields are ignored, every field has a default, and command-line
//! flags are applied on top (see [`Config::apply_overrides`]).

use crate::error::{QuillError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File name of the optional configuration file in the working directory.
pub const CONFIG_FILE_NAME: &str = ".quill.yaml";

/// Configuration for a quill server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Server settings
    // =========================================================================
    /// Address to listen on.
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Lock lifetime in milliseconds. Clients refresh at half this interval.
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,

    // =========================================================================
    // Export settings
    // =========================================================================
    /// Whether to render HTML on save (requires the converter to be installed).
    #[serde(default = "default_true")]
    pub export: bool,

    /// Markdown-to-HTML converter command line. The source path is appended.
    #[serde(default = "default_converter")]
    pub converter: String,

    /// Seconds a single converter run may take before it is killed (0 = unbounded).
    #[serde(default = "default_converter_timeout_secs")]
    pub converter_timeout_secs: u64,

    /// Output directory for rendered HTML, relative to the working directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding header/footer fragments and static assets.
    #[serde(default = "default_includes_dir")]
    pub includes_dir: String,
}

fn default_addr() -> String {
    "localhost:8080".to_string()
}
fn default_lock_ttl_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_converter() -> String {
    "cmark-gfm".to_string()
}
fn default_converter_timeout_secs() -> u64 {
    30
}
fn default_output_dir() -> String {
    "docs".to_string()
}
fn default_includes_dir() -> String {
    "_includes".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            lock_ttl_ms: default_lock_ttl_ms(),
            export: default_true(),
            converter: default_converter(),
            converter_timeout_secs: default_converter_timeout_secs(),
            output_dir: default_output_dir(),
            includes_dir: default_includes_dir(),
        }
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<String>,
    pub export: Option<bool>,
    pub converter: Option<String>,
}

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            QuillError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| QuillError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate.
    pub fn apply_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(addr) = overrides.addr {
            self.addr = addr;
        }
        if let Some(export) = overrides.export {
            self.export = export;
        }
        if let Some(converter) = overrides.converter {
            self.converter = converter;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `lock_ttl_ms` must be positive
    /// - `converter` must contain a program name
    /// - `output_dir` and `includes_dir` must be non-empty relative paths
    pub fn validate(&self) -> Result<()> {
        if self.lock_ttl_ms == 0 {
            return Err(QuillError::Config(
                "lock_ttl_ms must be greater than 0".to_string(),
            ));
        }

        let words = shell_words::split(&self.converter).map_err(|e| {
            QuillError::Config(format!("converter '{}' is not a valid command: {}", self.converter, e))
        })?;
        if words.is_empty() {
            return Err(QuillError::Config("converter must not be empty".to_string()));
        }

        for (key, dir) in [
            ("output_dir", &self.output_dir),
            ("includes_dir", &self.includes_dir),
        ] {
            if dir.is_empty() {
                return Err(QuillError::Config(format!("{} must not be empty", key)));
            }
            if Path::new(dir).is_absolute() {
                return Err(QuillError::Config(format!(
                    "{} must be relative to the working directory (found '{}')",
                    key, dir
                )));
            }
        }

        Ok(())
    }

    /// Lock lifetime as a [`Duration`].
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    /// Converter time bound, or `None` when unbounded.
    pub fn converter_timeout(&self) -> Option<Duration> {
        (self.converter_timeout_secs > 0).then(|| Duration::from_secs(self.converter_timeout_secs))
    }
}
