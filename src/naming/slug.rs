//! Title-to-filename slugs.

/// Turn free text into a filesystem- and URL-safe slug.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single hyphen, and trims leading and trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut last_was_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            result.push(c);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    result.trim_matches('-').to_string()
}
