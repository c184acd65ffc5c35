use regex::{Regex, RegexBuilder};

/// Case-insensitive literal phrase search.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrase: String,
    pattern: Regex,
}

impl PhraseMatcher {
    pub fn new(phrase: &str) -> Result<Self, MatcherError> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(MatcherError::EmptyPhrase);
        }

        let pattern = RegexBuilder::new(&regex::escape(phrase))
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            phrase: phrase.to_string(),
            pattern,
        })
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Target phrase is empty")]
    EmptyPhrase,

    #[error("Invalid phrase pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_ignores_case() {
        let matcher = PhraseMatcher::new("DRIVER LICENSE").unwrap();
        assert!(matcher.is_match("DRIVER LICENSE CLASS D"));
        assert!(matcher.is_match("state of iowa driver license"));
        assert!(matcher.is_match("Driver License"));
        assert!(!matcher.is_match("RECEIPT TOTAL $5.00"));
        assert!(!matcher.is_match("DRIVERS LICENSE"));
    }

    #[test]
    fn test_phrase_is_literal() {
        let matcher = PhraseMatcher::new("TOTAL $5.00").unwrap();
        assert!(matcher.is_match("receipt total $5.00"));
        assert!(!matcher.is_match("receipt total $5x00"));
    }

    #[test]
    fn test_empty_phrase_rejected() {
        assert!(matches!(PhraseMatcher::new("  "), Err(MatcherError::EmptyPhrase)));
    }
}
