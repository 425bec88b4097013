pub mod errors;
pub mod reader;
pub mod source;
pub mod writer;

pub use errors::SourceError;
pub use reader::{RawRecord, WarcReader};
pub use source::{
    ChainSource, DynWarcReader, MemorySource, RecordSource, count_records, from_reader,
    open_path, open_paths, open_reader, warc_reader,
};
pub use writer::WarcWriter;
