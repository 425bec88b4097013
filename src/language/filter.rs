use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

use crate::language::classifier::{
    ClassifierError, LanguageClassifier, classify_with_retry, probability_of,
};
use crate::language::words::WordPattern;

/// Knobs of the line-level language filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Floor on the target-language word ratio, checked first.
    pub min_ratio: f64,
    pub keep_word_count: usize,
    pub keep_ratio: f64,
    /// Per-line probability needed to credit a line to the target language.
    pub probability: f64,
    /// Lines with fewer words are counted but not classified.
    pub min_line_words: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_ratio: 0.01,
            keep_word_count: 10,
            keep_ratio: 0.25,
            probability: 0.999,
            min_line_words: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDecision {
    pub target_word_count: usize,
    pub total_word_count: usize,
    pub keep: bool,
}

impl LanguageDecision {
    pub fn from_counts(
        target_word_count: usize,
        total_word_count: usize,
        thresholds: &Thresholds,
    ) -> Self {
        Self {
            target_word_count,
            total_word_count,
            keep: decide(target_word_count, total_word_count, thresholds),
        }
    }

    /// Target-language share of all words, zero for a wordless document.
    pub fn ratio(&self) -> f64 {
        if self.total_word_count == 0 {
            0.0
        } else {
            self.target_word_count as f64 / self.total_word_count as f64
        }
    }
}

/// Keep when the ratio clears `min_ratio` and either the absolute target
/// word count or the ratio clears its keep threshold. Wordless documents are
/// never kept.
pub fn decide(target_word_count: usize, total_word_count: usize, thresholds: &Thresholds) -> bool {
    if total_word_count == 0 {
        return false;
    }
    let ratio = target_word_count as f64 / total_word_count as f64;
    if ratio < thresholds.min_ratio {
        return false;
    }
    target_word_count >= thresholds.keep_word_count || ratio >= thresholds.keep_ratio
}

/// Scores `text` line by line against `target` and renders a keep decision.
pub fn evaluate(
    text: &str,
    target: &str,
    classifier: &dyn LanguageClassifier,
    words: &WordPattern,
    thresholds: &Thresholds,
) -> Result<LanguageDecision, ClassifierError> {
    let mut target_words = 0;
    let mut total_words = 0;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let count = words.count(line);
        total_words += count;
        if count < thresholds.min_line_words {
            continue;
        }

        let scores = classify_with_retry(classifier, line)?;
        let probability = probability_of(&scores, target);
        trace!(words = count, probability, "classified line");
        if probability >= thresholds.probability {
            target_words += count;
        }
    }

    Ok(LanguageDecision::from_counts(target_words, total_words, thresholds))
}

/// A configured language filter: target, classifier, word rule and thresholds.
#[derive(Clone)]
pub struct LanguageFilter {
    target: String,
    classifier: Arc<dyn LanguageClassifier>,
    words: WordPattern,
    thresholds: Thresholds,
}

impl LanguageFilter {
    pub fn new(
        target: impl Into<String>,
        classifier: Arc<dyn LanguageClassifier>,
        words: WordPattern,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            target: target.into(),
            classifier,
            words,
            thresholds,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, text: &str) -> Result<LanguageDecision, ClassifierError> {
        evaluate(
            text,
            &self.target,
            self.classifier.as_ref(),
            &self.words,
            &self.thresholds,
        )
    }
}
