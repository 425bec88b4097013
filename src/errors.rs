use thiserror::Error;

use crate::dedup::StoreError;
use crate::extractor::ExtractError;
use crate::language::ClassifierError;
use crate::warc::SourceError;

/// Everything that can stop a record (or a whole run) from producing a decision.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    #[error("record has no {0} header")]
    MissingId(&'static str),

    #[error("empty content")]
    EmptyContent,

    #[error("empty extracted text")]
    EmptyExtractedText,

    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("language classification failed: {0}")]
    ClassificationFailure(String),

    #[error("encoding error: {0}")]
    EncodingFailure(String),

    #[error("capability call exceeded {0} ms")]
    Timeout(u64),

    #[error("fingerprint store unavailable: {0}")]
    StoreIoFailure(#[from] StoreError),

    #[error("record source failed: {0}")]
    Source(#[from] SourceError),

    #[error("output failed: {0}")]
    Output(#[from] std::io::Error),
}

/// Counter bucket a per-record failure is accounted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Empty,
    Unsupported,
    Error,
}

impl ProcessError {
    /// Whether the run must stop. Per-record kinds are caught at the record
    /// boundary; losing the store, the source or the output sink is not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::StoreIoFailure(_) => true,
            Self::Source(_) => true,
            Self::Output(_) => true,

            Self::MissingId(_) => false,
            Self::UnsupportedPayloadType(_) => false,
            Self::EmptyContent => false,
            Self::EmptyExtractedText => false,
            Self::ExtractionFailure(_) => false,
            Self::ClassificationFailure(_) => false,
            Self::EncodingFailure(_) => false,
            Self::Timeout(_) => false,
        }
    }

    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::EmptyContent | Self::EmptyExtractedText => FailureClass::Empty,
            Self::UnsupportedPayloadType(_) => FailureClass::Unsupported,
            _ => FailureClass::Error,
        }
    }
}

impl From<ExtractError> for ProcessError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Unsupported(mime) => Self::UnsupportedPayloadType(mime),
            ExtractError::Decode(msg) => Self::EncodingFailure(msg),
            ExtractError::Empty => Self::EmptyExtractedText,
            other => Self::ExtractionFailure(other.to_string()),
        }
    }
}

impl From<ClassifierError> for ProcessError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Encoding(msg) => Self::EncodingFailure(msg),
            other => Self::ClassificationFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_source_errors_are_fatal() {
        assert!(ProcessError::StoreIoFailure(StoreError::Closed).is_fatal());
        assert!(
            ProcessError::Source(SourceError::Framing {
                offset: 10,
                records: 1,
                reason: "bad".into()
            })
            .is_fatal()
        );
    }

    #[test]
    fn test_per_record_errors_are_not_fatal() {
        for err in [
            ProcessError::EmptyContent,
            ProcessError::EmptyExtractedText,
            ProcessError::UnsupportedPayloadType("image/png".into()),
            ProcessError::ExtractionFailure("boom".into()),
            ProcessError::ClassificationFailure("boom".into()),
            ProcessError::EncodingFailure("bad utf-8".into()),
            ProcessError::Timeout(10),
            ProcessError::MissingId("WARC-Refers-To"),
        ] {
            assert!(!err.is_fatal(), "{err} should not be fatal");
        }
    }

    #[test]
    fn test_failure_classes() {
        assert_eq!(ProcessError::EmptyContent.failure_class(), FailureClass::Empty);
        assert_eq!(
            ProcessError::EmptyExtractedText.failure_class(),
            FailureClass::Empty
        );
        assert_eq!(
            ProcessError::UnsupportedPayloadType("application/pdf".into()).failure_class(),
            FailureClass::Unsupported
        );
        assert_eq!(ProcessError::Timeout(5).failure_class(), FailureClass::Error);
    }

    #[test]
    fn test_extract_error_mapping() {
        let err: ProcessError = ExtractError::Decode("invalid utf-8".into()).into();
        assert!(matches!(err, ProcessError::EncodingFailure(_)));

        let err: ProcessError = ExtractError::Empty.into();
        assert!(matches!(err, ProcessError::EmptyExtractedText));

        let err: ProcessError = ExtractError::Backend {
            strategy: "dom",
            reason: "parse".into(),
        }
        .into();
        assert!(matches!(err, ProcessError::ExtractionFailure(_)));
    }
}
