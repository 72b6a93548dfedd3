//! Common utilities shared across the harness

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Truncate text to at most `max_chars` characters, appending `...` when cut
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_snippet("ok", 200), "ok");
        assert_eq!(truncate_snippet("", 200), "");
    }

    #[test]
    fn test_truncate_exact_length_unchanged() {
        let text = "a".repeat(200);
        assert_eq!(truncate_snippet(&text, 200), text);
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "b".repeat(250);
        let cut = truncate_snippet(&text, 200);
        assert_eq!(cut.len(), 203);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(201);
        let cut = truncate_snippet(&text, 200);
        assert_eq!(cut.chars().count(), 203);
    }
}
