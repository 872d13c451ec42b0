//! Reduces raw query text to a shape that is stable across literal values.
//!
//! Rules are plain regex substitutions applied in order, each one consuming the
//! previous rule's output. This is best-effort text matching, not SQL parsing:
//! unbalanced quotes are left to whatever the patterns happen to match.
//! Word boundaries are ASCII-only, so a digit run after a non-ASCII letter
//! (`é1`) still counts as a standalone number.

use once_cell::sync::Lazy;
use regex::Regex;

struct NormalizeRule {
    pattern: Regex,
    replacement: &'static str,
}

impl NormalizeRule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("normalize rule pattern is valid"),
            replacement,
        }
    }

    fn apply(&self, query: &str) -> String {
        self.pattern
            .replace_all(query, self.replacement)
            .into_owned()
    }
}

/// Order matters: the list collapse at the end looks for the `N`/`S`
/// placeholders produced by the literal rules before it.
static RULES: Lazy<Vec<NormalizeRule>> = Lazy::new(|| {
    vec![
        NormalizeRule::new(r"\s+", " "),
        NormalizeRule::new(r"[+\-]?(?-u:\b)[0-9]+(?-u:\b)", "N"),
        NormalizeRule::new(r"(?-u:\b)0x[0-9A-Fa-f]+(?-u:\b)", "0xN"),
        NormalizeRule::new(r"\\'", ""),
        NormalizeRule::new(r#"\\""#, ""),
        NormalizeRule::new(r"'[^']+'", "S"),
        NormalizeRule::new(r#""[^"]+""#, "S"),
        NormalizeRule::new(r"([NS]\s*,\s*){4,}", "..."),
    ]
});

pub fn normalize_query(query: &str) -> String {
    RULES
        .iter()
        .fold(query.trim().to_string(), |query, rule| rule.apply(&query))
}
