//! Write the records of an archive whose ids are listed (`--exclude`: not
//! listed) to a new archive.

use anyhow::Result;
use std::process::ExitCode;
use warcsift::cli::{self, FilterCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::main::<FilterCli>().await
}
