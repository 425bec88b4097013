use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed at offset {offset} after {records} records: {source}")]
    Io {
        offset: u64,
        records: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record at offset {offset} after {records} records: {reason}")]
    Framing {
        offset: u64,
        records: u64,
        reason: String,
    },
}
