//! Command line front ends of the `sift-*` binaries. Flags override the
//! `SIFT_*` environment variables they mirror.

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::Config;
use crate::logging;
use crate::runner::{self, FilterPaths, Task};
use crate::subset::Selection;

#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Log debug messages
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Log warnings and errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl LogArgs {
    /// Filter directives replacing the environment's, if a flag was given.
    pub fn level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}

/// Options shared by the tools that run records through the pipeline.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Archives to read; standard input when none (or `-`) is given
    #[arg(value_name = "WARC")]
    pub inputs: Vec<PathBuf>,
    #[command(flatten)]
    pub log: LogArgs,
    /// Identify records by WARC-Refers-To instead of WARC-Record-ID
    #[arg(short = 'r', long)]
    pub refers_to: bool,
    /// Process only this fraction of the records
    #[arg(short = 's', long, value_name = "RATIO")]
    pub sample: Option<f64>,
    /// Seed for sampling
    #[arg(long)]
    pub seed: Option<u64>,
    /// Records processed at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,
    /// Per-record processing limit
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
    /// Log progress every N records
    #[arg(long, value_name = "N")]
    pub progress_every: Option<u64>,
    /// Extract text from records of unknown content type too
    #[arg(long)]
    pub try_anyway: bool,
    /// Text extraction strategy
    #[arg(short = 'e', long, value_name = "NAME")]
    pub extractor: Option<String>,
}

impl RunArgs {
    /// Override only what was given on the command line.
    pub fn apply(&self, mut config: Config) -> Config {
        if self.refers_to {
            config = config.with_refers_to_as_id(true);
        }
        if let Some(ratio) = self.sample {
            config = config.with_sample_ratio(ratio);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_timeout_ms(timeout_ms);
        }
        if let Some(every) = self.progress_every {
            config = config.with_progress_every(every);
        }
        if self.try_anyway {
            config = config.with_try_anyway(true);
        }
        if let Some(name) = &self.extractor {
            config = config.with_extractor(name.clone());
        }
        config
    }
}

/// A binary's parsed command line, run to completion.
#[async_trait(?Send)]
pub trait Tool: Parser {
    fn log(&self) -> &LogArgs;

    /// `Ok(false)` when the tool finished but some input failed.
    async fn run(self) -> Result<bool>;
}

/// Entry point shared by every binary.
pub async fn main<T: Tool>() -> Result<ExitCode> {
    let tool = T::parse();
    logging::init(tool.log().level());

    Ok(if tool.run().await? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_task(task: Task, args: &RunArgs, config: Config) -> Result<bool> {
    let config = args.apply(config);
    config.validate()?;

    let report = runner::run(task, &config, &args.inputs).await?;
    eprintln!("Done, processed {}", report.counters);
    Ok(report.is_success())
}

/// Extract the text of HTML and plain text records as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "sift-extract")]
pub struct ExtractCli {
    #[command(flatten)]
    pub run: RunArgs,
    /// Print bare text instead of JSON lines
    #[arg(short = 't', long)]
    pub text_only: bool,
    /// Prepend to every record id
    #[arg(long, value_name = "PREFIX")]
    pub id_prefix: Option<String>,
}

impl ExtractCli {
    pub fn configure(&self, mut config: Config) -> Config {
        if self.text_only {
            config = config.with_text_only(true);
        }
        if let Some(prefix) = &self.id_prefix {
            config = config.with_id_prefix(prefix.clone());
        }
        config
    }
}

#[async_trait(?Send)]
impl Tool for ExtractCli {
    fn log(&self) -> &LogArgs {
        &self.run.log
    }

    async fn run(self) -> Result<bool> {
        let config = self.configure(Config::from_env()?);
        run_task(Task::Extract, &self.run, config).await
    }
}

/// Print the text fingerprint of every record.
#[derive(Debug, Parser)]
#[command(name = "sift-hashes")]
pub struct HashesCli {
    #[command(flatten)]
    pub run: RunArgs,
    /// Hash only the words of the text, ignoring numbers and layout
    #[arg(long)]
    pub letters_only: bool,
}

#[async_trait(?Send)]
impl Tool for HashesCli {
    fn log(&self) -> &LogArgs {
        &self.run.log
    }

    async fn run(self) -> Result<bool> {
        let mut config = Config::from_env()?;
        if self.letters_only {
            config = config.with_letters_only_hash(true);
        }
        run_task(Task::Hashes, &self.run, config).await
    }
}

/// Print the id of every record whose text was seen before.
#[derive(Debug, Parser)]
#[command(name = "sift-dedup")]
pub struct DedupCli {
    #[command(flatten)]
    pub run: RunArgs,
    /// Fingerprint database kept between runs
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Hash only the words of the text, ignoring numbers and layout
    #[arg(long)]
    pub letters_only: bool,
}

impl DedupCli {
    pub fn configure(&self, mut config: Config) -> Config {
        if let Some(db) = &self.db {
            config = config.with_db_path(db.clone());
        }
        if self.letters_only {
            config = config.with_letters_only_hash(true);
        }
        config
    }
}

#[async_trait(?Send)]
impl Tool for DedupCli {
    fn log(&self) -> &LogArgs {
        &self.run.log
    }

    async fn run(self) -> Result<bool> {
        let config = self.configure(Config::from_env()?);
        run_task(Task::Dedup, &self.run, config).await
    }
}

/// Decide per record whether its text is mostly in the target language.
#[derive(Debug, Parser)]
#[command(name = "sift-langfilter")]
pub struct LangFilterCli {
    #[command(flatten)]
    pub run: RunArgs,
    /// Target language code
    #[arg(short = 'l', long, value_name = "CODE")]
    pub language: Option<String>,
    /// Share of target-language words a record needs
    #[arg(long, value_name = "RATIO")]
    pub min_ratio: Option<f64>,
    /// Keep records with at least this many target-language words
    #[arg(long, value_name = "N")]
    pub keep_words: Option<usize>,
    /// Share needed when the word count alone does not decide
    #[arg(long, value_name = "RATIO")]
    pub keep_ratio: Option<f64>,
    /// Minimum classifier confidence for a line
    #[arg(short = 'p', long, value_name = "PROB")]
    pub lang_prob: Option<f64>,
    /// Lines with fewer words are not classified
    #[arg(long, value_name = "N")]
    pub min_line_words: Option<usize>,
}

impl LangFilterCli {
    pub fn configure(&self, mut config: Config) -> Config {
        if let Some(language) = &self.language {
            config = config.with_target_language(language.clone());
        }
        let mut thresholds = *config.thresholds();
        if let Some(ratio) = self.min_ratio {
            thresholds.min_ratio = ratio;
        }
        if let Some(words) = self.keep_words {
            thresholds.keep_word_count = words;
        }
        if let Some(ratio) = self.keep_ratio {
            thresholds.keep_ratio = ratio;
        }
        if let Some(probability) = self.lang_prob {
            thresholds.probability = probability;
        }
        if let Some(words) = self.min_line_words {
            thresholds.min_line_words = words;
        }
        config.with_thresholds(thresholds)
    }
}

#[async_trait(?Send)]
impl Tool for LangFilterCli {
    fn log(&self) -> &LogArgs {
        &self.run.log
    }

    async fn run(self) -> Result<bool> {
        let config = self.configure(Config::from_env()?);
        run_task(Task::LanguageFilter, &self.run, config).await
    }
}

/// Read archives to the end and report whether they are intact.
#[derive(Debug, Parser)]
#[command(name = "sift-check")]
pub struct CheckCli {
    #[arg(value_name = "WARC", required = true)]
    pub warcs: Vec<PathBuf>,
    #[command(flatten)]
    pub log: LogArgs,
}

#[async_trait(?Send)]
impl Tool for CheckCli {
    fn log(&self) -> &LogArgs {
        &self.log
    }

    async fn run(self) -> Result<bool> {
        let failed = runner::check_archives(&self.warcs, self.log.quiet, &mut io::stdout().lock())?;
        Ok(failed == 0)
    }
}

/// Copy the records whose ids are listed (or, with `--exclude`, the ones
/// that are not) to a new archive.
#[derive(Debug, Parser)]
#[command(name = "sift-filter")]
pub struct FilterCli {
    /// Record ids, one per line; further tab-separated fields are ignored
    #[arg(value_name = "IDS")]
    pub ids: PathBuf,
    #[arg(value_name = "WARC-IN")]
    pub input: PathBuf,
    #[arg(value_name = "WARC-OUT")]
    pub output: PathBuf,
    #[command(flatten)]
    pub log: LogArgs,
    /// Look records up by WARC-Refers-To instead of WARC-Record-ID
    #[arg(short = 'r', long)]
    pub refers_to: bool,
    /// Write the records that are not listed
    #[arg(long)]
    pub exclude: bool,
    /// Write plain WARC instead of one gzip member per record
    #[arg(long)]
    pub no_gzip: bool,
}

impl FilterCli {
    pub fn selection(&self) -> Selection {
        if self.exclude {
            Selection::Drop
        } else {
            Selection::Keep
        }
    }
}

#[async_trait(?Send)]
impl Tool for FilterCli {
    fn log(&self) -> &LogArgs {
        &self.log
    }

    async fn run(self) -> Result<bool> {
        let paths = FilterPaths {
            ids: self.ids.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
        };
        let gzip = !self.no_gzip;
        let report = runner::filter_archive(&paths, self.selection(), self.refers_to, gzip)?;
        eprintln!("Done, processed {}", report.counts);
        Ok(report.is_success())
    }
}
