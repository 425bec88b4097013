use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::config::Config;
use crate::dedup::{DuplicateDetector, SqliteStore};
use crate::extractor::Extractor;
use crate::language::{LanguageFilter, WhatlangClassifier};
use crate::output::{LineSink, TextFormat};
use crate::pipeline::{FingerprintRule, Pipeline, RunReport};
use crate::subset::{IdList, Selection, SubsetReport, write_subset};
use crate::warc::{RecordSource, WarcWriter, count_records, open_paths, open_reader};

/// Which pass over the archives to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Extracted text as JSONL (or bare text).
    Extract,
    /// `{id}\t{fingerprint}` per record.
    Hashes,
    /// `{id}\t{original}` per duplicate, against the persistent store.
    Dedup,
    /// `{id}\t{target}\t{total}\t{keep}` per record.
    LanguageFilter,
}

impl Task {
    pub fn label(self) -> &'static str {
        match self {
            Task::Extract => "extract",
            Task::Hashes => "hashes",
            Task::Dedup => "dedup",
            Task::LanguageFilter => "langfilter",
        }
    }
}

/// Build the pipeline for `task` and run it over `source`. The fingerprint
/// store of a dedup run is closed on every exit path.
pub async fn run_source<W: Write + Send>(
    task: Task,
    config: &Config,
    source: &mut dyn RecordSource,
    out: W,
    shutdown_token: CancellationToken,
) -> Result<RunReport> {
    let extractor = Extractor::from_name(config.extractor(), config.seed())
        .with_context(|| format!("resolving extractor '{}'", config.extractor()))?;

    let mut pipeline_config = config.pipeline_config();
    pipeline_config.emit_extracted = task == Task::Extract;
    pipeline_config.emit_fingerprints = task == Task::Hashes;

    let mut pipeline =
        Pipeline::new(extractor, pipeline_config).with_shutdown_token(shutdown_token);

    if config.letters_only_hash() {
        pipeline = pipeline.with_fingerprint_rule(FingerprintRule::Words(config.word_pattern()?));
    }

    if task == Task::LanguageFilter {
        anyhow::ensure!(
            WhatlangClassifier::knows(config.target_language()),
            "unknown target language {:?}, expected an ISO 639-3 code such as \"fin\"",
            config.target_language()
        );
        pipeline = pipeline.with_language_filter(LanguageFilter::new(
            config.target_language(),
            Arc::new(WhatlangClassifier),
            config.word_pattern()?,
            *config.thresholds(),
        ));
    }

    let format = if config.text_only() {
        TextFormat::TextOnly
    } else {
        TextFormat::Jsonl
    };
    let mut sink = LineSink::new(out)
        .with_format(format)
        .with_id_prefix(config.id_prefix().unwrap_or_default());

    if task != Task::Dedup {
        return Ok(pipeline.run(source, &mut sink).await);
    }

    let store = SqliteStore::open(config.db_path())
        .await
        .with_context(|| format!("opening fingerprint store {}", config.db_path().display()))?;
    let detector = Arc::new(DuplicateDetector::new(Arc::new(store)));
    pipeline = pipeline.with_detector(detector.clone());

    let report = pipeline.run(source, &mut sink).await;
    if let Err(e) = detector.close().await {
        error!("failed to close fingerprint store: {}", e);
    }
    Ok(report)
}

/// Open `inputs` (standard input when empty) and run `task` over them,
/// writing decisions to stdout. Ctrl-C stops reading and reports what was done.
pub async fn run(task: Task, config: &Config, inputs: &[PathBuf]) -> Result<RunReport> {
    let inputs = if inputs.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        inputs.to_vec()
    };
    let mut source = open_paths(&inputs).context("opening input archives")?;

    let shutdown_token = CancellationToken::new();
    let listener = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, finishing records in flight...");
        listener.cancel();
    });

    let stdout = BufWriter::new(io::stdout());
    run_source(task, config, &mut source, stdout, shutdown_token)
        .instrument(info_span!("run", task = task.label(), files = inputs.len()))
        .await
}

/// Read each archive to the end, printing `{path}: OK: {n} records` (unless
/// `quiet`) or `{path}: ERROR: {reason}`. Returns how many archives failed.
pub fn check_archives<W: Write>(paths: &[PathBuf], quiet: bool, out: &mut W) -> io::Result<usize> {
    let mut failed = 0;
    for path in paths {
        debug!("Start checking {}", path.display());
        match count_records(path) {
            Ok(records) if !quiet => writeln!(out, "{}: OK: {} records", path.display(), records)?,
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                let reason = e.to_string().replace('\n', " ");
                writeln!(out, "{}: ERROR: {}", path.display(), reason)?;
            }
        }
    }
    out.flush()?;
    Ok(failed)
}

/// Where `filter_archive` reads ids and records from and writes to. `-`
/// stands for standard input or output.
#[derive(Debug, Clone)]
pub struct FilterPaths {
    pub ids: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Copy the records of `paths.input` selected by the id list to
/// `paths.output`, gzip-compressed per record unless `gzip` is off.
pub fn filter_archive(
    paths: &FilterPaths,
    selection: Selection,
    use_refers_to: bool,
    gzip: bool,
) -> Result<SubsetReport> {
    let list = File::open(&paths.ids)
        .with_context(|| format!("opening id list {}", paths.ids.display()))?;
    let ids = IdList::read(BufReader::new(list))
        .with_context(|| format!("reading id list {}", paths.ids.display()))?;
    info!("{} ids loaded from {}", ids.len(), paths.ids.display());

    let mut reader = open_reader(&paths.input)?;
    let out: Box<dyn Write> = if paths.output.as_path() == Path::new("-") {
        Box::new(io::stdout())
    } else {
        let file = File::create(&paths.output)
            .with_context(|| format!("creating {}", paths.output.display()))?;
        Box::new(file)
    };
    let mut writer = WarcWriter::new(BufWriter::new(out), gzip);

    let mut report = write_subset(&mut reader, &ids, selection, use_refers_to, &mut writer);
    debug!("{} records written to {}", writer.records_written(), paths.output.display());
    if let Err(e) = writer.finish()
        && report.aborted.is_none()
    {
        report.aborted = Some(e.into());
    }

    match &report.aborted {
        Some(e) => error!("aborted after {}: {}", report.counts, e),
        None => info!("done, {}", report.counts),
    }
    Ok(report)
}
