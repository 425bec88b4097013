use crate::extractor::{ExtractError, Extracted, ExtractionInput, ExtractionStrategy};

/// Strict UTF-8 decode, whitespace preserved. Invalid input is an error here;
/// nothing is substituted before output serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextStrategy;

impl ExtractionStrategy for PlainTextStrategy {
    fn extract(&self, input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
        let text = std::str::from_utf8(input.content).map_err(|e| {
            ExtractError::Decode(format!("invalid utf-8 at byte {}", e.valid_up_to()))
        })?;
        Ok(Extracted::new(self.name(), text))
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}
