use regex::RegexBuilder;

/// Match `text` against a glob pattern.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one; both match across newlines and case-insensitively. A pattern with
/// neither wildcard compares for exact equality instead.
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return text == pattern;
    }

    let translated = regex::escape(pattern)
        .replace("\\*", ".*")
        .replace("\\?", ".");

    RegexBuilder::new(&format!("^{translated}$"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_compare_exactly() {
        assert!(wildcard_match("lit", "lit"));
        assert!(!wildcard_match("lit", "Lit"));
        assert!(!wildcard_match("lit", "literal"));
    }

    #[test]
    fn star_matches_anything() {
        assert!(wildcard_match("", "*"));
        assert!(wildcard_match("anything at all", "*"));
        assert!(wildcard_match("multi\nline", "*"));
    }

    #[test]
    fn star_matches_runs() {
        assert!(wildcard_match("value-123", "val*"));
        assert!(wildcard_match("value-123", "*123"));
        assert!(wildcard_match("value-123", "v*1*3"));
        assert!(!wildcard_match("value-123", "x*"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        assert!(wildcard_match("cat", "c?t"));
        assert!(!wildcard_match("cart", "c?t"));
        assert!(!wildcard_match("ct", "c?t"));
    }

    #[test]
    fn wildcards_ignore_case() {
        assert!(wildcard_match("Hello World", "hello*"));
        assert!(wildcard_match("ERROR", "err?r"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(wildcard_match("a.b+c", "a.b+*"));
        assert!(!wildcard_match("aXb+c", "a.b+*"));
        assert!(wildcard_match("(group)", "(group)"));
    }
}
