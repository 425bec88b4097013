pub mod charset;
pub mod cleaner;
pub mod dom;
pub mod errors;
pub mod model;
pub mod normalize;
pub mod plain;
pub mod reader;
pub mod registry;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use errors::ExtractError;
pub use model::ExtractedText;
pub use normalize::normalize;
pub use registry::{BUILTIN_STRATEGIES, RANDOM_STRATEGY, RandomChoice, StrategyRegistry};
pub use strategy::{Extracted, ExtractionInput, ExtractionStrategy};

use std::sync::Arc;

use crate::classify::PayloadClass;
use plain::PlainTextStrategy;

/// Routes classified payloads to the plain-text decoder or the configured
/// HTML strategy.
#[derive(Clone)]
pub struct Extractor {
    plain: PlainTextStrategy,
    html: Arc<dyn ExtractionStrategy>,
}

impl Extractor {
    pub fn new(html: Arc<dyn ExtractionStrategy>) -> Self {
        Self {
            plain: PlainTextStrategy,
            html,
        }
    }

    /// Resolve `name` against the built-in registry
    pub fn from_name(name: &str, seed: Option<u64>) -> Result<Self, ExtractError> {
        let html = StrategyRegistry::with_defaults().resolve(name, seed)?;
        Ok(Self::new(html))
    }

    pub fn html_strategy(&self) -> &str {
        self.html.name()
    }

    /// Extract raw (not yet normalized) text. Unsupported payloads never reach
    /// a strategy, and blank output is reported as [`ExtractError::Empty`].
    pub fn extract(
        &self,
        class: PayloadClass,
        input: &ExtractionInput<'_>,
    ) -> Result<Extracted, ExtractError> {
        let extracted = match class {
            PayloadClass::Unsupported => {
                return Err(ExtractError::Unsupported(
                    input.mime_type.unwrap_or("<none>").to_string(),
                ));
            }
            PayloadClass::PlainText => self.plain.extract(input)?,
            PayloadClass::HtmlLike | PayloadClass::BestEffortHtml => self.html.extract(input)?,
        };

        if extracted.text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(extracted)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Arc::new(dom::DomTextStrategy))
    }
}
