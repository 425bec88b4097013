//! Report records whose text was already seen, in this run or an earlier
//! one sharing the fingerprint database.

use anyhow::Result;
use std::process::ExitCode;
use warcsift::cli::{self, DedupCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::main::<DedupCli>().await
}
