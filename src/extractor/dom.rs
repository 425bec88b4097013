use scraper::Html;

use crate::extractor::charset::decode_markup;
use crate::extractor::{ExtractError, Extracted, ExtractionInput, ExtractionStrategy};

/// Elements whose text never counts as content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Whole-document text: every text node outside skipped elements, one per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomTextStrategy;

impl ExtractionStrategy for DomTextStrategy {
    fn extract(&self, input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
        let html = decode_markup(input.content, input.content_type);
        let document = Html::parse_document(&html);

        let mut pieces: Vec<&str> = Vec::new();
        for node in document.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let skipped = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            });
            if !skipped && !text.trim().is_empty() {
                pieces.push(text);
            }
        }

        if pieces.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(Extracted::new(self.name(), pieces.join("\n")))
    }

    fn name(&self) -> &'static str {
        "dom"
    }
}
