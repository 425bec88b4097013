//! Print `{id}\t{fingerprint}` for every record with extractable text.

use anyhow::Result;
use std::process::ExitCode;
use warcsift::cli::{self, HashesCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::main::<HashesCli>().await
}
