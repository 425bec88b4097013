use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::{self, BufRead, Read, Write};
use tracing::{trace, warn};

use crate::record::{Record, RecordType};
use crate::warc::SourceError;

const HEADER_TYPE: &str = "WARC-Type";
const HEADER_ID: &str = "WARC-Record-ID";
const HEADER_REFERS_TO: &str = "WARC-Refers-To";
const HEADER_TARGET_URI: &str = "WARC-Target-URI";
const HEADER_PAYLOAD_TYPE: &str = "WARC-Identified-Payload-Type";
const HEADER_DATE: &str = "WARC-Date";
const HEADER_CONTENT_TYPE: &str = "Content-Type";
const HEADER_CONTENT_LENGTH: &str = "Content-Length";

/// Blocks larger than this are treated as framing damage, not allocated.
const MAX_BLOCK_LEN: u64 = 1 << 31;
/// Longest version or header line accepted, newline included.
const MAX_LINE_LEN: u64 = 64 * 1024;

/// Streaming reader of WARC records from an uncompressed byte stream.
pub struct WarcReader<R> {
    inner: R,
    offset: u64,
    records: u64,
}

#[derive(Debug, Clone, Default)]
struct Headers(Vec<(String, String)>);

impl Headers {
    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn push_line(&mut self, line: &str) -> bool {
        if line.starts_with([' ', '\t']) {
            // folded continuation of the previous header
            if let Some((_, value)) = self.0.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
                return true;
            }
            return false;
        }
        match line.split_once(':') {
            Some((name, value)) => {
                self.0.push((name.trim().to_string(), value.trim().to_string()));
                true
            }
            None => false,
        }
    }
}

/// A record as framed in the archive: version line, headers in their
/// original order and the undecoded block.
#[derive(Debug, Clone)]
pub struct RawRecord {
    version: String,
    headers: Headers,
    block: Bytes,
}

impl RawRecord {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn record_id(&self) -> Option<&str> {
        self.header(HEADER_ID)
    }

    pub fn refers_to(&self) -> Option<&str> {
        self.header(HEADER_REFERS_TO)
    }

    /// Interpret the record for the pipeline, splitting off the HTTP head of
    /// responses.
    pub fn into_record(self) -> Record {
        let length = self.block.len() as u64;
        build_record(self.headers, self.block, length)
    }

    /// Serialize back to WARC framing. Folded headers come out unfolded.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}\r\n", self.version)?;
        for (name, value) in &self.headers.0 {
            write!(out, "{name}: {value}\r\n")?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(&self.block)?;
        out.write_all(b"\r\n\r\n")
    }
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            records: 0,
        }
    }

    /// Bytes consumed so far (of the decompressed stream)
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Next record, `Ok(None)` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<Record>, SourceError> {
        Ok(self.read_raw()?.map(RawRecord::into_record))
    }

    /// Next record without interpreting its block.
    pub fn read_raw(&mut self) -> Result<Option<RawRecord>, SourceError> {
        let (record_start, version) = loop {
            let line_start = self.offset;
            let Some(line) = self.read_line(line_start)? else {
                return Ok(None);
            };
            if !line.is_empty() {
                break (line_start, line);
            }
        };
        if !version.starts_with("WARC/") {
            let reason = format!("expected version line, got {version:?}");
            return Err(self.framing(record_start, reason));
        }

        let mut headers = Headers::default();
        loop {
            let Some(line) = self.read_line(record_start)? else {
                return Err(self.framing(record_start, "end of stream inside headers"));
            };
            if line.is_empty() {
                break;
            }
            if !headers.push_line(&line) {
                return Err(self.framing(record_start, format!("bad header line {line:?}")));
            }
        }

        let length = headers
            .get(HEADER_CONTENT_LENGTH)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|len| *len <= MAX_BLOCK_LEN)
            .ok_or_else(|| self.framing(record_start, "missing or invalid Content-Length"))?;

        // grow with the data actually present rather than trusting the header
        let mut block = Vec::new();
        let read = (&mut self.inner).take(length).read_to_end(&mut block);
        let read = read.map_err(|e| self.io(e))? as u64;
        self.offset += read;
        if read < length {
            return Err(self.framing(record_start, "truncated record block"));
        }
        self.records += 1;

        trace!(offset = record_start, id = ?headers.get(HEADER_ID), "read record");
        Ok(Some(RawRecord {
            version,
            headers,
            block: Bytes::from(block),
        }))
    }

    fn read_line(&mut self, record_start: u64) -> Result<Option<String>, SourceError> {
        let mut buf = Vec::new();
        let n = (&mut self.inner).take(MAX_LINE_LEN).read_until(b'\n', &mut buf);
        let n = n.map_err(|e| self.io(e))?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        if n as u64 == MAX_LINE_LEN && buf.last() != Some(&b'\n') {
            let reason = format!("line longer than {MAX_LINE_LEN} bytes");
            return Err(self.framing(record_start, reason));
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn framing(&self, offset: u64, reason: impl Into<String>) -> SourceError {
        SourceError::Framing {
            offset,
            records: self.records,
            reason: reason.into(),
        }
    }

    fn io(&self, source: std::io::Error) -> SourceError {
        SourceError::Io {
            offset: self.offset,
            records: self.records,
            source,
        }
    }
}

fn build_record(headers: Headers, block: Bytes, length: u64) -> Record {
    let record_type = headers
        .get(HEADER_TYPE)
        .map(RecordType::from_header)
        .unwrap_or(RecordType::Other);
    let block_type = headers.get(HEADER_CONTENT_TYPE);

    let is_http = block_type.is_some_and(|ct| ct.starts_with("application/http"));
    let (payload, content_type) = if record_type == RecordType::Response && is_http {
        let (http_type, body) = split_http_message(&block);
        (body, http_type.or(block_type.map(str::to_string)))
    } else {
        (block, block_type.map(str::to_string))
    };

    let capture_date = headers.get(HEADER_DATE).and_then(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| warn!("unparseable {} {:?}: {}", HEADER_DATE, raw, e))
            .ok()
    });

    Record {
        record_id: headers.get(HEADER_ID).map(str::to_string),
        refers_to: headers.get(HEADER_REFERS_TO).map(str::to_string),
        record_type,
        target_uri: headers.get(HEADER_TARGET_URI).map(str::to_string),
        mime_type: headers.get(HEADER_PAYLOAD_TYPE).map(str::to_string),
        content_type,
        payload,
        capture_date,
        content_length: Some(length),
    }
}

/// Split an HTTP response block into its `Content-Type` and body. A block
/// without a header terminator is all headers and has an empty body.
fn split_http_message(block: &Bytes) -> (Option<String>, Bytes) {
    let (head_end, body_start) = match find(block, b"\r\n\r\n") {
        Some(pos) => (pos, pos + 4),
        None => match find(block, b"\n\n") {
            Some(pos) => (pos, pos + 2),
            None => (block.len(), block.len()),
        },
    };

    let head = String::from_utf8_lossy(&block[..head_end]);
    let content_type = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(HEADER_CONTENT_TYPE))
        .map(|(_, value)| value.trim().to_string());

    (content_type, block.slice(body_start..))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warc_record(headers: &[(&str, &str)], block: &[u8]) -> Vec<u8> {
        let mut out = b"WARC/1.0\r\n".to_vec();
        for (k, v) in headers {
            out.extend_from_slice(format!("{k}: {v}\r\n").as_bytes());
        }
        out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", block.len()).as_bytes());
        out.extend_from_slice(block);
        out.extend_from_slice(b"\r\n\r\n");
        out
    }

    #[test]
    fn test_reads_response_and_strips_http_headers() {
        let http = b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<p>Hello</p>";
        let data = warc_record(
            &[
                ("WARC-Type", "response"),
                ("WARC-Record-ID", "<urn:uuid:1>"),
                ("WARC-Target-URI", "https://example.com/"),
                ("WARC-Date", "2023-03-20T10:00:00Z"),
                ("WARC-Identified-Payload-Type", "text/html"),
                ("Content-Type", "application/http; msgtype=response"),
            ],
            http,
        );

        let mut reader = WarcReader::new(&data[..]);
        let record = reader.read_record().unwrap().unwrap();

        assert_eq!(record.record_type, RecordType::Response);
        assert_eq!(record.record_id.as_deref(), Some("<urn:uuid:1>"));
        assert_eq!(record.target_uri.as_deref(), Some("https://example.com/"));
        assert_eq!(record.mime_type.as_deref(), Some("text/html"));
        assert_eq!(record.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(&record.payload[..], b"<p>Hello</p>");
        assert_eq!(record.content_length, Some(http.len() as u64));
        assert_eq!(
            record.capture_date.unwrap().to_rfc3339(),
            "2023-03-20T10:00:00+00:00"
        );

        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 1);
        assert_eq!(reader.offset(), data.len() as u64);
    }

    #[test]
    fn test_conversion_block_is_payload() {
        let data = warc_record(
            &[
                ("WARC-Type", "conversion"),
                ("WARC-Record-ID", "<urn:uuid:2>"),
                ("WARC-Refers-To", "<urn:uuid:1>"),
                ("Content-Type", "text/plain"),
            ],
            b"plain text body",
        );

        let record = WarcReader::new(&data[..]).read_record().unwrap().unwrap();
        assert_eq!(record.record_type, RecordType::Conversion);
        assert_eq!(record.refers_to.as_deref(), Some("<urn:uuid:1>"));
        assert_eq!(record.content_type.as_deref(), Some("text/plain"));
        assert_eq!(record.mime_type, None);
        assert_eq!(&record.payload[..], b"plain text body");
    }

    #[test]
    fn test_multiple_records_and_other_types() {
        let mut data = warc_record(&[("WARC-Type", "warcinfo")], b"software: test");
        data.extend(warc_record(
            &[("WARC-Type", "request"), ("WARC-Record-ID", "<urn:uuid:3>")],
            b"GET / HTTP/1.1\r\n\r\n",
        ));

        let mut reader = WarcReader::new(&data[..]);
        assert_eq!(reader.read_record().unwrap().unwrap().record_type, RecordType::Other);
        assert_eq!(reader.read_record().unwrap().unwrap().record_type, RecordType::Other);
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_block_is_framing_error() {
        let mut data = warc_record(&[("WARC-Type", "response")], b"0123456789");
        data.truncate(data.len() - 10);

        let err = WarcReader::new(&data[..]).read_record().unwrap_err();
        assert!(matches!(err, SourceError::Framing { offset: 0, records: 0, .. }));
    }

    #[test]
    fn test_garbage_reports_offset_and_count() {
        let mut data = warc_record(&[("WARC-Type", "conversion")], b"ok");
        let garbage_at = data.len() as u64;
        data.extend_from_slice(b"not a warc line\r\n");

        let mut reader = WarcReader::new(&data[..]);
        reader.read_record().unwrap().unwrap();
        match reader.read_record().unwrap_err() {
            SourceError::Framing { offset, records, .. } => {
                assert_eq!(offset, garbage_at);
                assert_eq!(records, 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_missing_content_length() {
        let data = b"WARC/1.0\r\nWARC-Type: response\r\n\r\n";
        let err = WarcReader::new(&data[..]).read_record().unwrap_err();
        assert!(matches!(
            err,
            SourceError::Framing { reason, .. } if reason.contains("Content-Length")
        ));
    }

    #[test]
    fn test_overlong_header_line_is_framing_error() {
        let mut data = b"WARC/1.0\r\nWARC-Type: ".to_vec();
        data.extend(std::iter::repeat_n(b'x', MAX_LINE_LEN as usize * 2));

        match WarcReader::new(&data[..]).read_record().unwrap_err() {
            SourceError::Framing { offset, reason, .. } => {
                assert_eq!(offset, 0);
                assert!(reason.contains("longer than"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_raw_record_writes_back_identically() {
        let data = warc_record(
            &[
                ("WARC-Type", "response"),
                ("WARC-Record-ID", "<urn:uuid:9>"),
                ("Content-Type", "application/http; msgtype=response"),
            ],
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<p>x</p>",
        );

        let raw = WarcReader::new(&data[..]).read_raw().unwrap().unwrap();
        assert_eq!(raw.record_id(), Some("<urn:uuid:9>"));
        let mut written = Vec::new();
        raw.write_to(&mut written).unwrap();
        assert_eq!(written, data);

        let record = raw.into_record();
        assert_eq!(&record.payload[..], b"<p>x</p>");
    }

    #[test]
    fn test_http_block_without_body() {
        let block = Bytes::from_static(b"HTTP/1.1 204 No Content\r\nContent-Type: text/html");
        let (content_type, body) = split_http_message(&block);
        assert_eq!(content_type.as_deref(), Some("text/html"));
        assert!(body.is_empty());
    }
}
