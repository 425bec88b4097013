#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;

/// A `response` record wrapping an HTTP message with the given body.
pub fn response(id: &str, uri: &str, payload_type: Option<&str>, body: &str) -> Vec<u8> {
    let http = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        payload_type.unwrap_or("text/html; charset=utf-8"),
        body.len(),
        body
    );
    let mut headers = vec![
        ("WARC-Type", "response".to_string()),
        ("WARC-Record-ID", format!("<{id}>")),
        ("WARC-Target-URI", uri.to_string()),
        ("WARC-Date", "2023-03-20T10:00:00Z".to_string()),
        ("Content-Type", "application/http; msgtype=response".to_string()),
    ];
    if let Some(payload_type) = payload_type {
        headers.push(("WARC-Identified-Payload-Type", payload_type.to_string()));
    }
    record(&headers, http.as_bytes())
}

/// A WET-style `conversion` record referring to the response it came from.
pub fn conversion(id: &str, refers_to: &str, text: &str) -> Vec<u8> {
    record(
        &[
            ("WARC-Type", "conversion".to_string()),
            ("WARC-Record-ID", format!("<{id}>")),
            ("WARC-Refers-To", format!("<{refers_to}>")),
            ("WARC-Target-URI", "https://example.fi/".to_string()),
            ("Content-Type", "text/plain".to_string()),
        ],
        text.as_bytes(),
    )
}

pub fn warcinfo() -> Vec<u8> {
    record(
        &[
            ("WARC-Type", "warcinfo".to_string()),
            ("WARC-Record-ID", "<urn:uuid:info>".to_string()),
        ],
        b"software: test\r\n",
    )
}

pub fn record(headers: &[(&str, String)], block: &[u8]) -> Vec<u8> {
    let mut out = b"WARC/1.1\r\n".to_vec();
    for (name, value) in headers {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", block.len()).as_bytes());
    out.extend_from_slice(block);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

/// Compress each record as its own gzip member, like `.warc.gz` files.
pub fn gzip_members(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(record).unwrap();
        out.extend(encoder.finish().unwrap());
    }
    out
}
