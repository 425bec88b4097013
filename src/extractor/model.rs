use serde::{Deserialize, Serialize};

use crate::extractor::normalize::normalize;
use crate::extractor::{ExtractError, Extracted};

/// Normalized text of one record together with where it came from.
///
/// Never empty and never contains NUL: the only constructor normalizes and
/// rejects text that normalizes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    record_id: String,
    source_mime_type: Option<String>,
    text: String,
    strategy: String,
    best_effort: bool,
}

impl ExtractedText {
    pub fn from_extracted(
        record_id: impl Into<String>,
        source_mime_type: Option<&str>,
        raw: Extracted,
        best_effort: bool,
    ) -> Result<Self, ExtractError> {
        let text = normalize(&raw.text);
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(Self {
            record_id: record_id.into(),
            source_mime_type: source_mime_type.map(str::to_string),
            text,
            strategy: raw.strategy.to_string(),
            best_effort,
        })
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn source_mime_type(&self) -> Option<&str> {
        self.source_mime_type.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Backend that produced the text (`plain`, `dom`, ...)
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// True when the payload type was unknown and extracted on a best-effort basis.
    pub fn is_best_effort(&self) -> bool {
        self.best_effort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_normalized() {
        let raw = Extracted::new("dom", "  Hello \0 \n\n world ");
        let text = ExtractedText::from_extracted("id-1", Some("text/html"), raw, false).unwrap();
        assert_eq!(text.text(), "Hello\nworld");
        assert_eq!(text.record_id(), "id-1");
        assert_eq!(text.source_mime_type(), Some("text/html"));
        assert_eq!(text.strategy(), "dom");
        assert!(!text.is_best_effort());
    }

    #[test]
    fn test_whitespace_only_is_rejected() {
        let raw = Extracted::new("plain", " \n\t\0 ");
        let err = ExtractedText::from_extracted("id-1", None, raw, true).unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }
}
