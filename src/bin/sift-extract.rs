//! Extract the text of HTML and plain text records, one JSON object per line.
//!
//! Usage: `sift-extract [OPTIONS] [WARC...]`; see `--help`. Flags override the
//! `SIFT_*` environment variables.

use anyhow::Result;
use std::process::ExitCode;
use warcsift::cli::{self, ExtractCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::main::<ExtractCli>().await
}
