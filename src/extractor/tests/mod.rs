use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classify::{PayloadClass, UnknownTypePolicy, classify};
use crate::extractor::{
    ExtractError, Extracted, ExtractedText, ExtractionInput, ExtractionStrategy, Extractor,
};

/// Counts calls so tests can prove a strategy was never invoked.
#[derive(Default)]
struct CountingStrategy {
    calls: AtomicUsize,
}

impl ExtractionStrategy for CountingStrategy {
    fn extract(&self, _input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Extracted::new(self.name(), "counted"))
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

struct FailingStrategy;

impl ExtractionStrategy for FailingStrategy {
    fn extract(&self, _input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
        Err(ExtractError::Backend {
            strategy: self.name(),
            reason: "parser exploded".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn input_for<'a>(content: &'a [u8], mime: &'a str) -> ExtractionInput<'a> {
    ExtractionInput {
        mime_type: Some(mime),
        ..ExtractionInput::new(content)
    }
}

#[test]
fn test_plain_text_record_extracts_verbatim() {
    let extractor = Extractor::new(Arc::new(CountingStrategy::default()));
    let class = classify(Some("text/plain"), None, UnknownTypePolicy::Reject);

    let out = extractor
        .extract(class, &input_for(b"hello world", "text/plain"))
        .unwrap();

    assert_eq!(out.text, "hello world");
    assert_eq!(out.strategy, "plain");
    assert_eq!(extractor.html_strategy(), "counting");
}

#[test]
fn test_html_record_drops_script() {
    let extractor = Extractor::default();
    let html = b"<html><body><script>bad()</script><p>Hello</p></body></html>";
    let class = classify(Some("text/html"), None, UnknownTypePolicy::Reject);

    let out = extractor.extract(class, &input_for(html, "text/html")).unwrap();
    let text = ExtractedText::from_extracted("r1", Some("text/html"), out, false).unwrap();

    assert!(text.text().contains("Hello"));
    assert!(!text.text().contains("bad()"));
}

#[test]
fn test_unsupported_short_circuits() {
    let strategy = Arc::new(CountingStrategy::default());
    let extractor = Extractor::new(strategy.clone());

    let err = extractor
        .extract(PayloadClass::Unsupported, &input_for(b"%PDF-1.4", "application/pdf"))
        .unwrap_err();

    assert!(matches!(err, ExtractError::Unsupported(mime) if mime == "application/pdf"));
    assert_eq!(strategy.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_best_effort_still_uses_html_strategy() {
    let strategy = Arc::new(CountingStrategy::default());
    let extractor = Extractor::new(strategy.clone());

    let out = extractor
        .extract(
            PayloadClass::BestEffortHtml,
            &input_for(b"<p>x</p>", "text/x-unknown"),
        )
        .unwrap();

    assert_eq!(out.strategy, "counting");
    assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backend_failure_is_not_success() {
    let extractor = Extractor::new(Arc::new(FailingStrategy));
    let err = extractor
        .extract(PayloadClass::HtmlLike, &input_for(b"<p>x</p>", "text/html"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::Backend { strategy: "failing", .. }));
}

#[test]
fn test_blank_plain_text_is_empty() {
    let extractor = Extractor::default();
    let err = extractor
        .extract(PayloadClass::PlainText, &input_for(b"  \n\t ", "text/plain"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::Empty));
}

#[test]
fn test_from_name() {
    assert_eq!(Extractor::from_name("dom", None).unwrap().html_strategy(), "dom");
    assert_eq!(
        Extractor::from_name("random", Some(3)).unwrap().html_strategy(),
        "random"
    );
    assert!(Extractor::from_name("goose3", None).is_err());
}

#[test]
fn test_readability_and_dom_agree_on_main_text() {
    let paragraph = "Building better software requires careful attention to design and testing. ";
    let html = format!(
        "<html><head><title>Tech Blog</title><style>p {{ margin: 0 }}</style></head>\
         <body><article><h1>Key Principles</h1><p>{}</p><p>{}</p></article>\
         <script>analytics()</script></body></html>",
        paragraph.repeat(12),
        paragraph.repeat(9)
    );

    for name in ["dom", "readability"] {
        let extractor = Extractor::from_name(name, None).unwrap();
        let out = extractor
            .extract(PayloadClass::HtmlLike, &input_for(html.as_bytes(), "text/html"))
            .unwrap();
        assert!(out.text.contains("Building better software"), "{name}");
        assert!(!out.text.contains("analytics()"), "{name}");
        assert!(!out.text.contains("margin"), "{name}");
    }
}
