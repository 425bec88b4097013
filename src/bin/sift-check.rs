//! Read archives through and print `{path}: OK: {n} records` or the error
//! that stopped the read. Exits with failure if any archive is broken.

use anyhow::Result;
use std::process::ExitCode;
use warcsift::cli::{self, CheckCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::main::<CheckCli>().await
}
