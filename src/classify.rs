/// Types extracted by plain decoding.
const PLAIN_TEXT_MIME_TYPES: &[&str] = &["text/plain"];

/// (X)HTML and similar markup.
const HTML_LIKE_MIME_TYPES: &[&str] = &[
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "application/http",
];

/// Types known to carry no extractable text (for now).
const UNSUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/rtf",
    "application/rdf+xml",
    "application/atom+xml",
    "application/rss+xml",
    "application/json",
    "application/octet-stream",
    "application/zip",
    "text/calendar",
];

/// Main types rejected unless a subtype is listed above.
const UNSUPPORTED_MAIN_TYPES: &[&str] = &["image", "audio", "video", "application"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadClass {
    PlainText,
    HtmlLike,
    /// Unknown type handed to the HTML strategies anyway.
    BestEffortHtml,
    Unsupported,
}

impl PayloadClass {
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn is_best_effort(self) -> bool {
        matches!(self, Self::BestEffortHtml)
    }
}

/// What to do with a MIME type no rule recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTypePolicy {
    #[default]
    Reject,
    TryAnyway,
}

/// Classifies a payload by MIME type. `fallback` is consulted only when
/// `mime_type` is absent.
pub fn classify(
    mime_type: Option<&str>,
    fallback: Option<&str>,
    policy: UnknownTypePolicy,
) -> PayloadClass {
    let Some(mime) = mime_type.or(fallback) else {
        return PayloadClass::Unsupported;
    };

    if PLAIN_TEXT_MIME_TYPES.contains(&mime) {
        return PayloadClass::PlainText;
    }
    if is_html_like(mime) {
        return PayloadClass::HtmlLike;
    }
    if UNSUPPORTED_MIME_TYPES.contains(&mime) {
        return PayloadClass::Unsupported;
    }
    if UNSUPPORTED_MAIN_TYPES
        .iter()
        .any(|main| mime.strip_prefix(main).is_some_and(|rest| rest.starts_with('/')))
    {
        return PayloadClass::Unsupported;
    }

    match policy {
        UnknownTypePolicy::Reject => PayloadClass::Unsupported,
        UnknownTypePolicy::TryAnyway => PayloadClass::BestEffortHtml,
    }
}

fn is_html_like(mime: &str) -> bool {
    HTML_LIKE_MIME_TYPES
        .iter()
        .any(|t| mime == *t || has_parameters_of(mime, t))
}

// Literal `type;` prefix: no case folding, no whitespace before the `;`.
fn has_parameters_of(mime: &str, bare: &str) -> bool {
    mime.strip_prefix(bare).is_some_and(|rest| rest.starts_with(';'))
}
