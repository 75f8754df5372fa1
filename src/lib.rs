//! Quill: a browser-based Markdown editor for a local directory.
//!
//! Documents are saved through [`save::SavePipeline`], which checks the
//! editor's lock, renames the file after its first heading, writes it
//! atomically, and renders HTML with an external converter.

pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod exit_codes;
pub mod export;
pub mod fs;
pub mod locks;
pub mod logging;
pub mod naming;
pub mod save;
pub mod server;
pub mod workspace;
