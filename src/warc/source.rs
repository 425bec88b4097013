use flate2::read::MultiGzDecoder;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::record::Record;
use crate::warc::{SourceError, WarcReader};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Anything that yields archive records in order.
pub trait RecordSource: Send {
    /// Next record, `Ok(None)` once the source is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>, SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        (**self).next_record()
    }
}

impl<R: BufRead + Send> RecordSource for WarcReader<R> {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        self.read_record()
    }
}

/// Records held in memory, mostly for tests and small batches.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: VecDeque<Record>,
}

impl MemorySource {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        Ok(self.records.pop_front())
    }
}

/// Chains several sources, reading each to the end before the next.
pub struct ChainSource {
    sources: VecDeque<Box<dyn RecordSource>>,
}

impl ChainSource {
    pub fn new(sources: Vec<Box<dyn RecordSource>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }
}

impl RecordSource for ChainSource {
    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        while let Some(source) = self.sources.front_mut() {
            if let Some(record) = source.next_record()? {
                return Ok(Some(record));
            }
            self.sources.pop_front();
        }
        Ok(None)
    }
}

/// Reader over any WARC byte stream, whatever its compression.
pub type DynWarcReader = WarcReader<Box<dyn BufRead + Send>>;

/// Wrap a byte stream in a WARC reader, transparently inflating gzip
/// (including the per-record multi-member layout of `.warc.gz`).
pub fn warc_reader<R: Read + Send + 'static>(reader: R) -> io::Result<DynWarcReader> {
    let mut buffered = BufReader::new(reader);
    let is_gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
    let inner: Box<dyn BufRead + Send> = if is_gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(buffered)))
    } else {
        Box::new(buffered)
    };
    Ok(WarcReader::new(inner))
}

/// Same as [`warc_reader`], as a record source.
pub fn from_reader<R: Read + Send + 'static>(
    reader: R,
) -> io::Result<Box<dyn RecordSource>> {
    Ok(Box::new(warc_reader(reader)?))
}

/// Open a WARC file, or standard input for `-`.
pub fn open_reader(path: &Path) -> Result<DynWarcReader, SourceError> {
    let open_err = |source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    };

    if path.as_os_str() == "-" {
        debug!("reading records from stdin");
        return warc_reader(io::stdin()).map_err(open_err);
    }

    let file = File::open(path).map_err(open_err)?;
    debug!("reading records from {}", path.display());
    warc_reader(file).map_err(open_err)
}

pub fn open_path(path: &Path) -> Result<Box<dyn RecordSource>, SourceError> {
    Ok(Box::new(open_reader(path)?))
}

/// Read every record of `path` without interpreting it, returning the count.
/// Truncation and framing damage surface as errors.
pub fn count_records(path: &Path) -> Result<u64, SourceError> {
    let mut reader = open_reader(path)?;
    while reader.read_raw()?.is_some() {}
    Ok(reader.records_read())
}

/// Open every path in order as one stream of records.
pub fn open_paths(paths: &[impl AsRef<Path>]) -> Result<Box<dyn RecordSource>, SourceError> {
    let sources = paths
        .iter()
        .map(|p| open_path(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Box::new(ChainSource::new(sources)))
}
