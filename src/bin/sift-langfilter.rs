//! Decide per record whether its text is mostly in the target language.

use anyhow::Result;
use std::process::ExitCode;
use warcsift::cli::{self, LangFilterCli};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    cli::main::<LangFilterCli>().await
}
