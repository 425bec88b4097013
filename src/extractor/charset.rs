use encoding_rs::Encoding;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

const SNIFF_LEN: usize = 4096;

/// Picks the encoding of a markup payload: `Content-Type` parameter first,
/// then `<meta>` declarations in the first 4KB, then chardetng's guess.
pub fn detect_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    if let Some(encoding) = content_type.and_then(|ct| label_from(&CHARSET_REGEX, ct)) {
        return encoding;
    }

    let head = &body[..body.len().min(SNIFF_LEN)];
    let head_str = String::from_utf8_lossy(head);

    if let Some(encoding) = label_from(&META_CHARSET_REGEX, &head_str) {
        return encoding;
    }
    if let Some(encoding) = label_from(&META_HTTP_EQUIV_REGEX, &head_str) {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body.len() <= SNIFF_LEN);
    detector.guess(None, true)
}

fn label_from(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let captures = regex.captures(haystack)?;
    let label = captures.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

/// Decodes markup to UTF-8. Malformed sequences become U+FFFD; markup is
/// routinely mislabelled and a partial page is still worth extracting.
pub fn decode_markup(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(content_type, body);
    let (decoded, used, had_errors) = encoding.decode(body);
    if had_errors {
        debug!("replaced malformed {} sequences", used.name());
    }
    decoded.into_owned()
}
