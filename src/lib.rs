pub mod classify;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod errors;
pub mod extractor;
pub mod language;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod runner;
pub mod subset;
pub mod warc;

pub use errors::ProcessError;
