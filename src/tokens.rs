//! Cheap, deterministic token estimate for message content.
//!
//! This is not a tokenizer. It approximates BPE token counts closely enough for
//! showing running totals next to a conversation.

use crate::constants::tokens::CHARS_PER_TOKEN;

/// Estimates the token count of `content`.
///
/// Counts Unicode scalar values, not bytes, and rounds up so any non-empty text
/// costs at least one token. Empty or whitespace-only text costs zero.
#[must_use]
pub fn estimate_tokens(content: &str) -> u32 {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return 0;
    }

    let chars = trimmed.chars().count();
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_free() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \n\t"), 0);
    }

    #[test]
    fn rounds_up_partial_tokens() {
        assert_eq!(estimate_tokens("hi"), 1);
        assert_eq!(estimate_tokens("four"), 1);
        assert_eq!(estimate_tokens("fives"), 2);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 4 chars, 12 bytes
        assert_eq!(estimate_tokens("日本語だ"), 1);
    }

    #[test]
    fn deterministic_for_repeated_calls() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let first = estimate_tokens(text);
        for _ in 0..10 {
            assert_eq!(estimate_tokens(text), first);
        }
        assert_eq!(first, 11);
    }
}
