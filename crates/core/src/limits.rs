//! Bounded string limits
//!
//! Plan explanations and migration error messages are capped so a snapshot
//! of either can be copied into a fixed 256-byte buffer (255 bytes plus a
//! terminator) by callers that need one.

/// Maximum length in bytes of a plan explanation or migration error message
pub const MAX_MESSAGE_BYTES: usize = 255;

/// Truncate `s` to at most [`MAX_MESSAGE_BYTES`] bytes
///
/// Cuts on a UTF-8 character boundary, so the result may be a few bytes
/// shorter than the cap when a multi-byte character straddles it.
pub fn bounded_message(s: &str) -> String {
    truncate_to(s, MAX_MESSAGE_BYTES).to_string()
}

/// Longest prefix of `s` that fits in `max_bytes` and ends on a char boundary
pub fn truncate_to(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_message_unchanged() {
        assert_eq!(bounded_message("hello"), "hello");
        assert_eq!(bounded_message(""), "");
    }

    #[test]
    fn test_long_ascii_truncated() {
        let s = "x".repeat(1000);
        assert_eq!(bounded_message(&s).len(), MAX_MESSAGE_BYTES);
    }

    #[test]
    fn test_multibyte_boundary() {
        // 'é' is two bytes; 128 of them is 256 bytes, one over the cap
        let s = "é".repeat(128);
        let out = bounded_message(&s);
        assert_eq!(out.len(), 254);
        assert!(out.chars().all(|c| c == 'é'));
    }

    proptest! {
        #[test]
        fn prop_bounded_is_prefix_within_cap(s in ".{0,400}") {
            let out = bounded_message(&s);
            prop_assert!(out.len() <= MAX_MESSAGE_BYTES);
            prop_assert!(s.starts_with(&out));
        }
    }
}
