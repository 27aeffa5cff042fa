//! Token counting and truncation
//!
//! Tokens are whitespace-separated words. This is an approximation of the
//! subword tokens the summarization backends count, close enough to keep
//! requests under their input limits.

/// Number of whitespace-separated tokens in `text`
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `max` tokens of `text`, joined by single spaces
///
/// Text already within the limit is returned unchanged.
pub fn truncate_tokens(text: &str, max: usize) -> String {
    if count_tokens(text) <= max {
        return text.to_string();
    }
    text.split_whitespace()
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Output token budget of `per_unit` tokens per requested unit plus `slack`
///
/// Saturates at `u32::MAX` instead of wrapping.
pub fn output_budget(units: usize, per_unit: usize, slack: usize) -> u32 {
    let budget = units.saturating_mul(per_unit).saturating_add(slack);
    u32::try_from(budget).unwrap_or(u32::MAX)
}

/// Prefix of at most `max` characters, never splitting a character
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("   "), 0);
        assert_eq!(count_tokens("quantum  key\tdistribution\n"), 3);
    }

    #[test]
    fn test_truncate_tokens() {
        let text = "one two  three four";
        assert_eq!(truncate_tokens(text, 10), text);
        assert_eq!(truncate_tokens(text, 2), "one two");
        assert_eq!(truncate_tokens(text, 0), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("żółw", 2), "żó");
    }

    #[test]
    fn test_output_budget() {
        assert_eq!(output_budget(60, 2, 32), 152);
        assert_eq!(output_budget(0, 12, 32), 32);
        assert_eq!(output_budget(usize::MAX, 2, 32), u32::MAX);
        assert_eq!(output_budget(u32::MAX as usize, 1, 1), u32::MAX);
    }
}
