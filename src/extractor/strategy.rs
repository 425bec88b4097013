use crate::extractor::ExtractError;

/// Raw material handed to an extraction strategy.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub content: &'a [u8],
    pub uri: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    /// Transport `Content-Type`, used for charset hints.
    pub content_type: Option<&'a str>,
}

impl<'a> ExtractionInput<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            content,
            uri: None,
            mime_type: None,
            content_type: None,
        }
    }
}

/// Text produced by a strategy, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub strategy: &'static str,
}

impl Extracted {
    pub fn new(strategy: &'static str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            strategy,
        }
    }
}

/// One interchangeable way of turning payload bytes into text.
///
/// Implementations must drop script, style and noscript content and must
/// report failures as errors rather than as empty text.
pub trait ExtractionStrategy: Send + Sync + 'static {
    fn extract(&self, input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError>;

    /// Name this strategy is registered under
    fn name(&self) -> &'static str;
}
