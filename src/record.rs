use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const HEADER_RECORD_ID: &str = "WARC-Record-ID";
pub const HEADER_REFERS_TO: &str = "WARC-Refers-To";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Response,
    Conversion,
    Other,
}

impl RecordType {
    pub fn from_header(value: &str) -> Self {
        match value.trim() {
            "response" => Self::Response,
            "conversion" => Self::Conversion,
            _ => Self::Other,
        }
    }
}

/// One archived capture, immutable once produced by a record source.
#[derive(Debug, Clone)]
pub struct Record {
    pub record_id: Option<String>,
    pub refers_to: Option<String>,
    pub record_type: RecordType,
    pub target_uri: Option<String>,
    /// Identified payload type, when the archive carries one.
    pub mime_type: Option<String>,
    /// `Content-Type` of the captured HTTP response (or of the record block
    /// for non-HTTP records); the classifier falls back to it.
    pub content_type: Option<String>,
    pub payload: Bytes,
    pub capture_date: Option<DateTime<Utc>>,
    pub content_length: Option<u64>,
}

impl Record {
    /// Minimal record, mostly useful for tests and synthetic sources.
    pub fn new(
        record_id: impl Into<String>,
        record_type: RecordType,
        mime_type: Option<&str>,
        payload: impl Into<Bytes>,
    ) -> Self {
        let payload = payload.into();
        Self {
            record_id: Some(record_id.into()),
            refers_to: None,
            record_type,
            target_uri: None,
            mime_type: mime_type.map(str::to_string),
            content_type: None,
            content_length: Some(payload.len() as u64),
            payload,
            capture_date: None,
        }
    }

    /// The identifier decisions are reported under, with angle brackets removed.
    /// `None` means the chosen header is missing.
    pub fn id(&self, use_refers_to: bool) -> Option<String> {
        let raw = if use_refers_to {
            self.refers_to.as_deref()
        } else {
            self.record_id.as_deref()
        };
        raw.map(clean_id)
    }

    pub fn id_header(use_refers_to: bool) -> &'static str {
        if use_refers_to {
            HEADER_REFERS_TO
        } else {
            HEADER_RECORD_ID
        }
    }
}

/// Strips the `<...>` wrapper archives put around record ids.
pub fn clean_id(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
        .to_string()
}
