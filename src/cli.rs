//! CLI argument parsing for quill.
//!
//! Uses clap derive macros. Every flag is optional; values left unset fall
//! back to the configuration file, then to built-in defaults.

use crate::config::{CONFIG_FILE_NAME, Overrides};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Quill: edit the Markdown files in a directory from your browser.
///
/// Documents autosave as you type and are renamed after their first heading.
/// When a converter such as cmark-gfm is installed, every save is also
/// rendered to HTML under docs/.
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on, e.g. localhost:8080 or 127.0.0.1:8080.
    #[arg(long)]
    pub addr: Option<String>,

    /// Export HTML on save (`--export false` to disable).
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    pub export: Option<bool>,

    /// Markdown-to-HTML converter command; the source path is appended.
    #[arg(long)]
    pub converter: Option<String>,

    /// Directory containing the Markdown documents.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file [default: <ROOT>/.quill.yaml].
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse arguments from the process command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Path of the configuration file to load.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.root.join(CONFIG_FILE_NAME))
    }

    /// Flag values that override the configuration file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            addr: self.addr.clone(),
            export: self.export,
            converter: self.converter.clone(),
        }
    }
}
