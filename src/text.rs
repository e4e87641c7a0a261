//! Input validation and normalisation applied before any model call.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AnalysisError, Result};

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+|www\.\S+").expect("url pattern is valid"));
static REPEATED_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([!?.])[!?.]+").expect("punctuation pattern is valid"));

/// Rejects empty (after trimming) and over-long input. Length is counted in
/// characters, not bytes.
pub fn validate_text(text: &str, max_length: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AnalysisError::Validation("Text cannot be empty".into()));
    }
    if text.chars().count() > max_length {
        return Err(AnalysisError::Validation(format!(
            "Text exceeds maximum length of {max_length} characters"
        )));
    }
    Ok(())
}

/// Collapses whitespace, strips URLs and squeezes runs of `!?.` to their first
/// character.
pub fn clean_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_urls = URL.replace_all(&collapsed, "");
    let squeezed = REPEATED_PUNCT.replace_all(&without_urls, "$1");
    squeezed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_are_rejected() {
        for text in ["", "   ", "\n\t"] {
            assert_eq!(
                validate_text(text, 10),
                Err(AnalysisError::Validation("Text cannot be empty".into()))
            );
        }
    }

    #[test]
    fn length_limit_counts_characters() {
        assert!(validate_text("héllo", 5).is_ok());
        let err = validate_text("héllo!", 5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Text exceeds maximum length of 5 characters"
        );
    }

    #[test]
    fn cleaning() {
        assert_eq!(clean_text("  so   good!!!  "), "so good!");
        assert_eq!(clean_text("wait?!? what..."), "wait? what.");
        assert_eq!(
            clean_text("see https://example.com/x and www.example.org now"),
            "see  and  now"
        );
    }

    #[test]
    fn text_that_is_only_a_url_cleans_to_empty() {
        assert_eq!(clean_text("http://example.com"), "");
    }
}
