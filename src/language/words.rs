use regex::Regex;

/// Maximal runs of Unicode letters; digits and underscores never count.
pub const DEFAULT_WORD_PATTERN: &str = r"[^\W\d_]+";

/// Compiled word-boundary rule shared by the language filter and
/// letters-only fingerprinting.
#[derive(Debug, Clone)]
pub struct WordPattern {
    regex: Regex,
}

impl WordPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }

    /// Words of `text` joined by single spaces
    pub fn words_only(&self, text: &str) -> String {
        self.regex
            .find_iter(text)
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for WordPattern {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_PATTERN).expect("default word pattern compiles")
    }
}
