//! First-level heading extraction.

use regex::Regex;
use std::sync::LazyLock;

/// `# Title` on its own line, optionally indented. Only spaces and tabs
/// separate the marker from the text; a heading never spans lines.
static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^[ \t]*#[ \t]+(.+?)[ \t]*$").expect("Invalid ATX heading regex"));

/// A text line underlined by a line of `=` characters.
static SETEXT_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mR)^[ \t]*([^\r\n]+?)[ \t]*\r?\n[ \t]*=+[ \t]*$").expect("Invalid setext heading regex")
});

/// Return the text of the first level-one heading in `content`.
///
/// Both ATX (`# Title`) and setext (`Title` over `===`) headings are
/// recognized; whichever starts earlier wins. Returns an empty string when
/// there is no heading, or when both forms match at the same offset.
pub fn extract_title(content: &str) -> String {
    let atx = ATX_HEADING.captures(content);
    let setext = SETEXT_HEADING.captures(content);

    let winner = match (atx, setext) {
        (None, None) => return String::new(),
        (Some(atx), None) => atx,
        (None, Some(setext)) => setext,
        (Some(atx), Some(setext)) => {
            let atx_start = atx.get(0).map_or(0, |m| m.start());
            let setext_start = setext.get(0).map_or(0, |m| m.start());
            match atx_start.cmp(&setext_start) {
                std::cmp::Ordering::Less => atx,
                std::cmp::Ordering::Greater => setext,
                std::cmp::Ordering::Equal => return String::new(),
            }
        }
    };

    winner
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
