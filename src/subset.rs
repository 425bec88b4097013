//! Writing a subset of an archive selected by record id, so the id lists the
//! other tools print (duplicates, kept or discarded records) can be applied
//! back to the WARC files.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::io::{self, BufRead, Write};
use tracing::{info, instrument};

use crate::errors::ProcessError;
use crate::record::clean_id;
use crate::warc::{RawRecord, WarcReader, WarcWriter};

const PROGRESS_EVERY: u64 = 10_000;

/// Record ids read from a list, one per line. Only the first tab-separated
/// field counts, so decision lines can be used as they are; ids compare
/// without their angle brackets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(HashSet<String>);

impl IdList {
    pub fn read<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut ids = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let first = line.split('\t').next().unwrap_or_default();
            let id = clean_id(first);
            if !id.is_empty() {
                ids.insert(id);
            }
        }
        Ok(Self(ids))
    }

    pub fn contains(&self, raw_id: &str) -> bool {
        self.0.contains(&clean_id(raw_id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IdList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|id| {
                    let id: String = id.into();
                    clean_id(&id)
                })
                .collect(),
        )
    }
}

/// Whether listed records are the ones written or the ones left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Keep,
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubsetCounts {
    pub total: u64,
    pub output: u64,
}

impl fmt::Display for SubsetCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} records, output {}", self.total, self.output)
    }
}

/// Counts are kept even when the copy stopped on an error.
#[derive(Debug)]
pub struct SubsetReport {
    pub counts: SubsetCounts,
    pub aborted: Option<ProcessError>,
}

impl SubsetReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Which header a record is looked up by.
fn lookup_id(record: &RawRecord, use_refers_to: bool) -> Option<&str> {
    if use_refers_to {
        record.refers_to()
    } else {
        record.record_id()
    }
}

/// Copy the records of `reader` selected by `ids` to `writer`, unchanged.
/// A record without the lookup header is never listed.
#[instrument(skip_all, fields(ids = ids.len(), selection = ?selection))]
pub fn write_subset<R: BufRead, W: Write>(
    reader: &mut WarcReader<R>,
    ids: &IdList,
    selection: Selection,
    use_refers_to: bool,
    writer: &mut WarcWriter<W>,
) -> SubsetReport {
    let mut counts = SubsetCounts::default();
    let aborted = loop {
        let record = match reader.read_raw() {
            Ok(Some(record)) => record,
            Ok(None) => break None,
            Err(e) => break Some(ProcessError::from(e)),
        };
        counts.total += 1;

        let listed = lookup_id(&record, use_refers_to).is_some_and(|id| ids.contains(id));
        let selected = match selection {
            Selection::Keep => listed,
            Selection::Drop => !listed,
        };
        if selected {
            if let Err(e) = writer.write(&record) {
                break Some(ProcessError::from(e));
            }
            counts.output += 1;
        }

        if counts.total % PROGRESS_EVERY == 0 {
            info!("processed {}", counts);
        }
    };

    SubsetReport { counts, aborted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warc::SourceError;
    use std::io::Cursor;

    fn record(id: &str, refers_to: &str) -> Vec<u8> {
        let body = format!("text of {id}");
        format!(
            "WARC/1.0\r\nWARC-Type: conversion\r\nWARC-Record-ID: <{id}>\r\nWARC-Refers-To: <{refers_to}>\r\nContent-Length: {}\r\n\r\n{body}\r\n\r\n",
            body.len()
        )
        .into_bytes()
    }

    fn archive() -> Vec<u8> {
        ["urn:uuid:1", "urn:uuid:2", "urn:uuid:3"]
            .iter()
            .enumerate()
            .flat_map(|(i, id)| record(id, &format!("urn:uuid:r{}", i + 1)))
            .collect()
    }

    fn written_ids(bytes: Vec<u8>) -> Vec<String> {
        let mut reader = WarcReader::new(Cursor::new(bytes));
        let mut ids = Vec::new();
        while let Some(raw) = reader.read_raw().unwrap() {
            ids.push(raw.record_id().unwrap_or_default().to_string());
        }
        ids
    }

    #[test]
    fn test_id_list_takes_first_field_and_strips_brackets() {
        let list = IdList::read(Cursor::new("urn:uuid:2\turn:uuid:1\n<urn:uuid:3>\n\n")).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains("<urn:uuid:2>"));
        assert!(list.contains("urn:uuid:3"));
        assert!(!list.contains("<urn:uuid:1>"));
    }

    #[test]
    fn test_keep_listed_records() {
        let data = archive();
        let ids: IdList = ["urn:uuid:1", "urn:uuid:3"].into_iter().collect();
        let mut writer = WarcWriter::new(Vec::new(), false);

        let report = write_subset(
            &mut WarcReader::new(&data[..]),
            &ids,
            Selection::Keep,
            false,
            &mut writer,
        );

        assert!(report.is_success());
        assert_eq!(report.counts, SubsetCounts { total: 3, output: 2 });
        let bytes = writer.finish().unwrap();
        assert_eq!(written_ids(bytes), vec!["<urn:uuid:1>", "<urn:uuid:3>"]);
    }

    #[test]
    fn test_drop_listed_records_by_refers_to() {
        let data = archive();
        let ids: IdList = ["urn:uuid:r2"].into_iter().collect();
        let mut writer = WarcWriter::new(Vec::new(), false);

        let report = write_subset(
            &mut WarcReader::new(&data[..]),
            &ids,
            Selection::Drop,
            true,
            &mut writer,
        );

        assert_eq!(report.counts.output, 2);
        let bytes = writer.finish().unwrap();
        assert_eq!(written_ids(bytes), vec!["<urn:uuid:1>", "<urn:uuid:3>"]);
    }

    #[test]
    fn test_truncated_input_keeps_counts() {
        let mut data = archive();
        data.truncate(data.len() - 10);
        let ids: IdList = ["urn:uuid:1", "urn:uuid:2", "urn:uuid:3"].into_iter().collect();
        let mut writer = WarcWriter::new(Vec::new(), false);

        let report = write_subset(
            &mut WarcReader::new(&data[..]),
            &ids,
            Selection::Keep,
            false,
            &mut writer,
        );

        assert!(matches!(
            report.aborted,
            Some(ProcessError::Source(SourceError::Framing { records: 2, .. }))
        ));
        assert_eq!(report.counts, SubsetCounts { total: 2, output: 2 });
    }
}
