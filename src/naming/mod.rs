//! Content-driven file naming.
//!
//! A document whose first heading is `# My Note` is saved as `my-note.md`.
//! This module extracts that heading, turns it into a slug, and picks a
//! target name that never overwrites another document.

mod resolve;
mod slug;
mod title;

pub use resolve::{
    is_reserved, make_unique, make_unique_for, output_name_for, resolve_target, split_extension,
};
pub use slug::slugify;
pub use title::extract_title;
