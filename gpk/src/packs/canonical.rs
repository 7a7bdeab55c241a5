//! Title canonicalization for fuzzy matching
//!
//! Window titles arrive with decorations that defeat a plain substring test:
//! zero-width joiners, full-width forms, accents, punctuation and odd spacing.
//! Both sides of a match are reduced with [`canonicalize`] first.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Control, format, combining marks, punctuation, separators and whitespace
static STRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Cc}\p{Cf}\p{Mn}\p{Me}\p{P}\p{Z}\s]").expect("static canonicalization pattern")
});

/// Decompose to NFKD, lowercase and drop everything but letters, digits and symbols
///
/// Stripping runs last so marks introduced by case mapping (`İ` → `i̇`) go too.
pub fn canonicalize(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let lowered = s.nfkd().collect::<String>().to_lowercase();
    STRIP.replace_all(&lowered, "").into_owned()
}
