use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};

use crate::warc::RawRecord;

/// Writes records back out as WARC, each record its own gzip member when
/// compressing (the `.warc.gz` layout readers can seek into).
pub struct WarcWriter<W: Write> {
    inner: W,
    gzip: bool,
    records: u64,
}

impl<W: Write> WarcWriter<W> {
    pub fn new(inner: W, gzip: bool) -> Self {
        Self {
            inner,
            gzip,
            records: 0,
        }
    }

    pub fn write(&mut self, record: &RawRecord) -> io::Result<()> {
        if self.gzip {
            let mut encoder = GzEncoder::new(&mut self.inner, Compression::default());
            record.write_to(&mut encoder)?;
            encoder.finish()?;
        } else {
            record.write_to(&mut self.inner)?;
        }
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
