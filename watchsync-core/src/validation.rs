//! Input normalization shared by the command handlers
//!
//! Limits are counted in characters, not bytes, so multi-byte names and
//! messages are never cut in the middle of a code point.

/// Maximum display name length in characters
pub const MAX_NAME_CHARS: usize = 40;

/// Maximum chat message length in characters
pub const MAX_CHAT_CHARS: usize = 2000;

/// Display name used when none is given
pub const DEFAULT_NAME: &str = "Guest";

/// Keep at most `max` characters of `input`
#[must_use]
pub fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

/// Trim and truncate a display name, falling back to [`DEFAULT_NAME`]
#[must_use]
pub fn normalize_name(name: Option<&str>) -> String {
    let trimmed = name.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return DEFAULT_NAME.to_string();
    }
    truncate_chars(trimmed, MAX_NAME_CHARS)
}

/// Truncate chat text to [`MAX_CHAT_CHARS`]. Returns `None` for blank text.
#[must_use]
pub fn normalize_chat_text(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    Some(truncate_chars(text, MAX_CHAT_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 3), "hi");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(None), "Guest");
        assert_eq!(normalize_name(Some("   ")), "Guest");
        assert_eq!(normalize_name(Some(" alice ")), "alice");

        let long = "x".repeat(100);
        assert_eq!(normalize_name(Some(&long)).chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_normalize_chat_text() {
        assert_eq!(normalize_chat_text(""), None);
        assert_eq!(normalize_chat_text(" \n "), None);
        assert_eq!(normalize_chat_text("hey").as_deref(), Some("hey"));

        let long = "ü".repeat(2500);
        let text = normalize_chat_text(&long).unwrap();
        assert_eq!(text.chars().count(), MAX_CHAT_CHARS);
    }
}
