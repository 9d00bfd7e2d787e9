/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences the model sometimes wraps JSON answers in.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundary() {
        let text = "Flamingo 火鳥";
        let truncated = truncate_to_char_boundary(text, 10);
        assert!(truncated.len() <= 10);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn truncate_within_bounds_is_identity() {
        assert_eq!(truncate_to_char_boundary("Ember", 100), "Ember");
    }

    #[test]
    fn strip_code_blocks_handles_fenced_json() {
        assert_eq!(strip_code_blocks("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  {}  "), "{}");
    }
}
