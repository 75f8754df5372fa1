//! Filesystem utilities for quill.
//!
//! Documents and rendered pages are replaced wholesale on every save, so all
//! writes go through [`atomic_write`] and readers never observe a half-written
//! file. Renamed documents are claimed with [`atomic_create`] so a rename
//! never lands on top of another document.

pub mod atomic;

pub use atomic::{atomic_create, atomic_write};
