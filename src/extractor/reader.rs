use readability::extractor;
use url::Url;

use crate::extractor::charset::decode_markup;
use crate::extractor::cleaner::strip_non_content;
use crate::extractor::{ExtractError, Extracted, ExtractionInput, ExtractionStrategy};

const PLACEHOLDER_URL: &str = "http://localhost/";

/// Main-content extraction with the readability scoring algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityStrategy;

impl ExtractionStrategy for ReadabilityStrategy {
    fn extract(&self, input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
        let html = decode_markup(input.content, input.content_type);
        let cleaned = strip_non_content(&html);
        let url = base_url(input.uri)?;

        let product = extractor::extract(&mut cleaned.as_bytes(), &url).map_err(|e| {
            ExtractError::Backend {
                strategy: self.name(),
                reason: e.to_string(),
            }
        })?;

        if product.text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(Extracted::new(self.name(), product.text))
    }

    fn name(&self) -> &'static str {
        "readability"
    }
}

// Only used to resolve relative links, which we discard anyway.
fn base_url(uri: Option<&str>) -> Result<Url, ExtractError> {
    match uri.and_then(|u| Url::parse(u).ok()) {
        Some(url) => Ok(url),
        None => Url::parse(PLACEHOLDER_URL).map_err(|e| ExtractError::Backend {
            strategy: ReadabilityStrategy.name(),
            reason: format!("base url: {e}"),
        }),
    }
}
