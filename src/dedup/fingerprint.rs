use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language::WordPattern;

/// 128-bit MD5 digest of normalized text. Deterministic across runs and
/// platforms; collisions are negligible for deduplication purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn of_text(text: &str) -> Self {
        Self(md5::compute(text.as_bytes()).0)
    }

    /// Digest of the letter runs only, ignoring digits, punctuation and layout.
    /// `None` when the text has no words at all.
    pub fn of_words(text: &str, words: &WordPattern) -> Option<Self> {
        let joined = words.words_only(text);
        if joined.is_empty() {
            return None;
        }
        Some(Self::of_text(&joined))
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Fingerprint {
    type Error = std::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(bytes.try_into()?))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(Fingerprint::of_text("hello world"), Fingerprint::of_text("hello world"));
        assert_ne!(Fingerprint::of_text("hello world"), Fingerprint::of_text("hello world!"));
    }

    #[test]
    fn test_hex_display_is_md5() {
        assert_eq!(
            Fingerprint::of_text("").to_string(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(Fingerprint::of_text("abc").to_string().len(), 32);
    }

    #[test]
    fn test_words_fingerprint_ignores_numbers_and_layout() {
        let words = WordPattern::default();
        assert_eq!(
            Fingerprint::of_words("Updated 2023-01-01\nHello, world!", &words),
            Fingerprint::of_words("Updated 2024-12-31 Hello world", &words)
        );
        assert_eq!(
            Fingerprint::of_words("Hello world", &words),
            Some(Fingerprint::of_text("Hello world"))
        );
    }

    #[test]
    fn test_letterless_text_has_no_words_fingerprint() {
        let words = WordPattern::default();
        assert_eq!(Fingerprint::of_words("2024-01-01 12:00", &words), None);
        assert_eq!(Fingerprint::of_words("31.12.2023", &words), None);
    }

    #[test]
    fn test_slice_conversion() {
        let fp = Fingerprint::of_text("x");
        assert_eq!(Fingerprint::try_from(&fp.as_bytes()[..]).unwrap(), fp);
        assert!(Fingerprint::try_from(&[0u8; 3][..]).is_err());
    }
}
