//! Display normalization for model replies.

use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is a valid regex"));

/// Remove markdown bold markers: `**text**` becomes `text`.
///
/// Only balanced pairs around non-empty, star-free text are touched, so the
/// function is idempotent and leaves plain text unchanged.
pub fn strip_bold(text: &str) -> String {
    BOLD.replace_all(text, "$1").into_owned()
}

/// Normalize a raw provider reply for display: strip bold markers and trim.
pub fn normalize_reply(raw: &str) -> String {
    strip_bold(raw).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_pairs() {
        assert_eq!(strip_bold("**hi** there **you**"), "hi there you");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(strip_bold("nothing to see"), "nothing to see");
        assert_eq!(strip_bold("a * b ** c"), "a * b ** c");
    }

    #[test]
    fn strip_is_idempotent() {
        let once = strip_bold("**bold** and *italic* and ****");
        assert_eq!(strip_bold(&once), once);
        assert_eq!(once, "bold and *italic* and ****");
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_reply("\n  **Answer**: 42 \n"), "Answer: 42");
    }
}
