//! Deterministic, human-friendly slug derivation.

use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// True when `input` is already in canonical slug form.
pub fn is_slug(input: &str) -> bool {
    !input.is_empty() && slugify(input) == input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_normalizes_text() {
        assert_eq!(
            derive_slug("Local News & Sports").expect("slug"),
            "local-news-sports"
        );
    }

    #[test]
    fn derive_slug_rejects_empty_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn is_slug_accepts_canonical_form_only() {
        assert!(is_slug("local-news"));
        assert!(!is_slug("Local News"));
        assert!(!is_slug(""));
    }
}
