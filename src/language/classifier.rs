use std::borrow::Cow;

use thiserror::Error;
use whatlang::{Lang, detect};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The span could not be represented the way the backend needs it.
    #[error("cannot encode text span: {0}")]
    Encoding(String),

    #[error("classifier failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageScore {
    pub lang: String,
    pub probability: f64,
}

impl LanguageScore {
    pub fn new(lang: impl Into<String>, probability: f64) -> Self {
        Self {
            lang: lang.into(),
            probability,
        }
    }
}

/// Injected language identification capability: one text span in, a
/// probability per candidate language out.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageClassifier: Send + Sync + 'static {
    fn classify(&self, text: &str) -> Result<Vec<LanguageScore>, ClassifierError>;
}

/// Probability assigned to `target`, zero when the classifier did not list it.
pub fn probability_of(scores: &[LanguageScore], target: &str) -> f64 {
    scores
        .iter()
        .filter(|s| s.lang == target)
        .map(|s| s.probability)
        .fold(0.0, f64::max)
}

/// Classify, retrying once on a lossily re-encoded copy when the backend
/// rejects the span's encoding.
pub fn classify_with_retry(
    classifier: &dyn LanguageClassifier,
    text: &str,
) -> Result<Vec<LanguageScore>, ClassifierError> {
    match classifier.classify(text) {
        Err(ClassifierError::Encoding(_)) => classifier.classify(&lossy_reencode(text)),
        other => other,
    }
}

/// Replaces control characters and Unicode noncharacters with U+FFFD.
pub fn lossy_reencode(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_unencodable) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if is_unencodable(c) { '\u{FFFD}' } else { c })
            .collect(),
    )
}

fn is_unencodable(c: char) -> bool {
    let cp = c as u32;
    (c.is_control() && c != '\t' && c != '\n')
        || (0xFDD0..=0xFDEF).contains(&cp)
        || (cp & 0xFFFE) == 0xFFFE
}

/// [`LanguageClassifier`] backed by whatlang's trigram model. Languages are
/// named by their ISO 639-3 code (`fin`, `swe`, `eng`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangClassifier;

impl WhatlangClassifier {
    /// Whether `code` names a language the model can report.
    pub fn knows(code: &str) -> bool {
        Lang::from_code(code).is_some()
    }
}

impl LanguageClassifier for WhatlangClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LanguageScore>, ClassifierError> {
        Ok(detect(text)
            .map(|info| vec![LanguageScore::new(info.lang().code(), info.confidence())])
            .unwrap_or_default())
    }
}
