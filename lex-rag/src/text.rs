//! Normalization of extracted legal text before ingestion.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\w\s.,;:!?()\[\]\-'"/]"#).expect("valid regex")
});
static SECTION_ABBREV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bSec\b\.?\s*").expect("valid regex"));
static ARTICLE_ABBREV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bArt\b\.?\s*").expect("valid regex"));

/// Clean raw extracted text.
///
/// Collapses whitespace runs to one space, replaces characters outside word
/// characters and common legal punctuation with a space, expands `Sec.` to
/// `Section ` and `Art.` to `Article `, and trims the result.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = WHITESPACE.replace_all(text, " ");
    let text = DISALLOWED.replace_all(&text, " ");
    let text = SECTION_ABBREV.replace_all(&text, "Section ");
    let text = ARTICLE_ABBREV.replace_all(&text, "Article ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(clean_text("  The  Act\n\n applies\t"), "The Act applies");
    }

    #[test]
    fn expands_abbreviations() {
        assert_eq!(clean_text("See Sec. 6 and Art 21."), "See Section 6 and Article 21.");
    }

    #[test]
    fn strips_unsupported_symbols() {
        assert_eq!(clean_text("Rs. 40,000 @ 10%"), "Rs. 40,000   10");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_text(""), "");
    }
}
