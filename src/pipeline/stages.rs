use bytes::Bytes;
use chrono::SecondsFormat;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinError};
use tracing::{debug, instrument};

use crate::classify::{PayloadClass, UnknownTypePolicy, classify};
use crate::dedup::Fingerprint;
use crate::errors::ProcessError;
use crate::extractor::{ExtractedText, ExtractionInput, Extractor};
use crate::language::{LanguageDecision, LanguageFilter, WordPattern};
use crate::output::{ExtractionReport, ReportMeta};
use crate::record::{Record, RecordType};

/// What text a fingerprint is computed from.
#[derive(Debug, Clone, Default)]
pub enum FingerprintRule {
    /// The normalized text as is.
    #[default]
    Text,
    /// Only the words of the normalized text, joined by single spaces.
    Words(WordPattern),
}

impl FingerprintRule {
    /// `None` when the rule leaves nothing to hash.
    pub fn fingerprint(&self, text: &str) -> Option<Fingerprint> {
        match self {
            FingerprintRule::Text => Some(Fingerprint::of_text(text)),
            FingerprintRule::Words(words) => Fingerprint::of_words(text, words),
        }
    }
}

/// Result of the order-independent part of processing one record.
#[derive(Debug)]
pub enum Outcome {
    /// Dropped by sampling before any processing.
    Skipped,
    /// Neither a response nor a conversion.
    Excluded,
    Failed {
        record_type: RecordType,
        id: Option<String>,
        error: ProcessError,
    },
    Processed {
        record_type: RecordType,
        item: Box<Processed>,
    },
}

/// A record that made it through extraction and normalization.
#[derive(Debug)]
pub struct Processed {
    pub text: ExtractedText,
    pub fingerprint: Fingerprint,
    pub language: Option<LanguageDecision>,
    pub uri: Option<String>,
    pub download_date: Option<String>,
    pub source_length: Option<u64>,
}

impl Processed {
    pub fn id(&self) -> &str {
        self.text.record_id()
    }

    pub fn report(&self) -> ExtractionReport {
        ExtractionReport {
            id: self.id().to_string(),
            text: self.text.text().to_string(),
            meta: ReportMeta {
                uri: self.uri.clone(),
                source_type: self.text.source_mime_type().map(str::to_string),
                download_date: self.download_date.clone(),
                source_length: self.source_length,
                extractor: self.text.strategy().to_string(),
                best_effort: self.text.is_best_effort(),
            },
        }
    }
}

/// Per-record stages that are pure functions of the record: classification,
/// extraction, normalization, fingerprinting and language evaluation.
#[derive(Clone)]
pub struct Stages {
    pub extractor: Extractor,
    pub policy: UnknownTypePolicy,
    pub refers_to_as_id: bool,
    pub language: Option<LanguageFilter>,
    pub fingerprint: FingerprintRule,
    pub timeout: Duration,
}

impl Stages {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            policy: UnknownTypePolicy::default(),
            refers_to_as_id: false,
            language: None,
            fingerprint: FingerprintRule::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub async fn process(self: Arc<Self>, record: Record) -> Outcome {
        let record_type = record.record_type;
        if record_type == RecordType::Other {
            return Outcome::Excluded;
        }

        let Some(id) = record.id(self.refers_to_as_id) else {
            return Outcome::Failed {
                record_type,
                id: None,
                error: ProcessError::MissingId(Record::id_header(self.refers_to_as_id)),
            };
        };

        match self.process_identified(&id, record).await {
            Ok(item) => Outcome::Processed {
                record_type,
                item: Box::new(item),
            },
            Err(error) => Outcome::Failed {
                record_type,
                id: Some(id),
                error,
            },
        }
    }

    #[instrument(skip(self, record), fields(mime = ?record.mime_type))]
    async fn process_identified(
        &self,
        id: &str,
        record: Record,
    ) -> Result<Processed, ProcessError> {
        if record.payload.is_empty() {
            return Err(ProcessError::EmptyContent);
        }

        let source_type = record.mime_type.clone().or_else(|| record.content_type.clone());
        let class = classify(
            record.mime_type.as_deref(),
            record.content_type.as_deref(),
            self.policy,
        );
        if class == PayloadClass::Unsupported {
            return Err(ProcessError::UnsupportedPayloadType(
                source_type.unwrap_or_else(|| "<none>".to_string()),
            ));
        }
        debug!(?class, "classified payload");

        let raw = {
            let extractor = self.extractor.clone();
            let payload: Bytes = record.payload.clone();
            let uri = record.target_uri.clone();
            let mime = source_type.clone();
            let content_type = record.content_type.clone();
            self.with_deadline(
                move || {
                    let input = ExtractionInput {
                        content: &payload,
                        uri: uri.as_deref(),
                        mime_type: mime.as_deref(),
                        content_type: content_type.as_deref(),
                    };
                    extractor.extract(class, &input)
                },
                |e| ProcessError::ExtractionFailure(format!("extraction task failed: {e}")),
            )
            .await??
        };

        let text = ExtractedText::from_extracted(
            id,
            source_type.as_deref(),
            raw,
            class.is_best_effort(),
        )?;
        let fingerprint = self
            .fingerprint
            .fingerprint(text.text())
            .ok_or(ProcessError::EmptyExtractedText)?;

        let language = match &self.language {
            Some(filter) => {
                let filter = filter.clone();
                let owned = text.text().to_string();
                let decision = self
                    .with_deadline(
                        move || filter.evaluate(&owned),
                        |e| {
                            ProcessError::ClassificationFailure(format!(
                                "classifier task failed: {e}"
                            ))
                        },
                    )
                    .await??;
                Some(decision)
            }
            None => None,
        };

        Ok(Processed {
            text,
            fingerprint,
            language,
            uri: record.target_uri,
            download_date: record
                .capture_date
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            source_length: record.content_length,
        })
    }

    /// Run a capability call on the blocking pool, giving up after the
    /// configured deadline. A timed-out call keeps its thread until it
    /// returns; its result is dropped.
    async fn with_deadline<T, F>(
        &self,
        call: F,
        on_panic: impl FnOnce(JoinError) -> ProcessError,
    ) -> Result<T, ProcessError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.timeout, task::spawn_blocking(call)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) => Err(on_panic(join_error)),
            Err(_) => Err(ProcessError::Timeout(
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractError, Extracted, ExtractionStrategy};
    use crate::language::{LanguageClassifier, LanguageScore, Thresholds};
    use crate::language::ClassifierError;

    struct Stalling;

    impl ExtractionStrategy for Stalling {
        fn extract(&self, _input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Extracted::new("stalling", "too late"))
        }

        fn name(&self) -> &'static str {
            "stalling"
        }
    }

    struct Panicking;

    impl ExtractionStrategy for Panicking {
        fn extract(&self, _input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
            panic!("backend bug")
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    struct AllFinnish;

    impl LanguageClassifier for AllFinnish {
        fn classify(&self, _text: &str) -> Result<Vec<LanguageScore>, ClassifierError> {
            Ok(vec![LanguageScore::new("fi", 1.0)])
        }
    }

    fn stages() -> Arc<Stages> {
        Arc::new(Stages::new(Extractor::default()))
    }

    fn html(id: &str, body: &'static str) -> Record {
        Record::new(id, RecordType::Response, Some("text/html"), body)
    }

    #[tokio::test]
    async fn test_other_record_types_are_excluded() {
        let record = Record::new("<x>", RecordType::Other, Some("text/plain"), "hello");
        assert!(matches!(stages().process(record).await, Outcome::Excluded));
    }

    #[tokio::test]
    async fn test_missing_refers_to_is_an_error() {
        let mut stages = Stages::new(Extractor::default());
        stages.refers_to_as_id = true;
        let record = Record::new("<x>", RecordType::Conversion, Some("text/plain"), "hello");
        match Arc::new(stages).process(record).await {
            Outcome::Failed { id: None, error, .. } => {
                assert!(matches!(error, ProcessError::MissingId("WARC-Refers-To")));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_payload_never_reaches_extraction() {
        let mut stages = Stages::new(Extractor::new(Arc::new(Panicking)));
        stages.timeout = Duration::from_secs(5);
        let record = html("<e>", "");
        match Arc::new(stages).process(record).await {
            Outcome::Failed { error, .. } => assert!(matches!(error, ProcessError::EmptyContent)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_type_short_circuits() {
        let stages = Arc::new(Stages::new(Extractor::new(Arc::new(Panicking))));
        let record = Record::new("<p>", RecordType::Response, Some("application/pdf"), "%PDF-1.4");
        match stages.process(record).await {
            Outcome::Failed { error, .. } => {
                assert!(matches!(
                    error,
                    ProcessError::UnsupportedPayloadType(t) if t == "application/pdf"
                ));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_html_record_is_processed() {
        let record = html(
            "<urn:uuid:1>",
            "<html><body><script>bad()</script><p>Hello</p></body></html>",
        );
        match stages().process(record).await {
            Outcome::Processed { record_type, item } => {
                assert_eq!(record_type, RecordType::Response);
                assert_eq!(item.id(), "urn:uuid:1");
                assert!(item.text.text().contains("Hello"));
                assert!(!item.text.text().contains("bad()"));
                assert_eq!(item.fingerprint, Fingerprint::of_text(item.text.text()));
                assert!(item.language.is_none());
                assert_eq!(item.report().meta.extractor, "dom");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_markup_only_document_is_empty() {
        let record = html("<m>", "<html><head><style>p{}</style></head><body></body></html>");
        match stages().process(record).await {
            Outcome::Failed { error, .. } => {
                assert!(matches!(error, ProcessError::EmptyExtractedText));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stalled_extraction_times_out() {
        let mut stages = Stages::new(Extractor::new(Arc::new(Stalling)));
        stages.timeout = Duration::from_millis(20);
        match Arc::new(stages).process(html("<s>", "<p>x</p>")).await {
            Outcome::Failed { error, .. } => assert!(matches!(error, ProcessError::Timeout(20))),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_strategy_fails_one_record() {
        let stages = Arc::new(Stages::new(Extractor::new(Arc::new(Panicking))));
        match stages.process(html("<p>", "<p>x</p>")).await {
            Outcome::Failed { error, .. } => {
                assert!(matches!(error, ProcessError::ExtractionFailure(_)));
                assert!(!error.is_fatal());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_language_and_word_fingerprint() {
        let mut stages = Stages::new(Extractor::default());
        stages.language = Some(LanguageFilter::new(
            "fi",
            Arc::new(AllFinnish),
            WordPattern::default(),
            Thresholds::default(),
        ));
        stages.fingerprint = FingerprintRule::Words(WordPattern::default());

        let record = Record::new(
            "<w>",
            RecordType::Conversion,
            Some("text/plain"),
            "Hyvää   päivää 2024!",
        );
        match Arc::new(stages).process(record).await {
            Outcome::Processed { item, .. } => {
                let decision = item.language.unwrap();
                assert_eq!(decision.total_word_count, 2);
                assert_eq!(decision.target_word_count, 2);
                assert!(decision.keep);
                assert_eq!(item.fingerprint, Fingerprint::of_text("Hyvää päivää"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_letterless_text_is_empty_under_word_rule() {
        let mut stages = Stages::new(Extractor::default());
        stages.fingerprint = FingerprintRule::Words(WordPattern::default());
        let stages = Arc::new(stages);

        for (id, body) in [("<a>", "2024-01-01 12:00"), ("<b>", "31.12.2023")] {
            let record = Record::new(id, RecordType::Conversion, Some("text/plain"), body);
            match stages.clone().process(record).await {
                Outcome::Failed { error, .. } => {
                    assert!(matches!(error, ProcessError::EmptyExtractedText));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }
}
