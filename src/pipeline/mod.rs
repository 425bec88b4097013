pub mod counters;
pub mod stages;

pub use counters::{Counter, CounterSnapshot, RunCounters};
pub use stages::{FingerprintRule, Outcome, Processed, Stages};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::classify::UnknownTypePolicy;
use crate::dedup::{DedupOutcome, DuplicateDetector};
use crate::errors::{FailureClass, ProcessError};
use crate::extractor::Extractor;
use crate::language::LanguageFilter;
use crate::output::{Decision, DecisionSink};
use crate::record::RecordType;
use crate::warc::RecordSource;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Records processed concurrently; outcomes are still committed in order.
    pub concurrency: usize,
    /// Log counters every this many records (0 disables).
    pub progress_every: u64,
    /// Deadline for a single extraction or classification call.
    pub timeout: Duration,
    pub sample_ratio: Option<f64>,
    pub seed: Option<u64>,
    pub refers_to_as_id: bool,
    pub policy: UnknownTypePolicy,
    pub emit_fingerprints: bool,
    pub emit_extracted: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_every: 1000,
            timeout: Duration::from_secs(30),
            sample_ratio: None,
            seed: None,
            refers_to_as_id: false,
            policy: UnknownTypePolicy::Reject,
            emit_fingerprints: false,
            emit_extracted: false,
        }
    }
}

/// Final state of a run. Counters are reported even when the run aborted.
#[derive(Debug)]
pub struct RunReport {
    pub counters: CounterSnapshot,
    pub interrupted: bool,
    pub aborted: Option<ProcessError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
    }
}

enum Slot {
    Ready(Outcome),
    Running {
        record_type: RecordType,
        handle: JoinHandle<Outcome>,
    },
}

impl Slot {
    async fn resolve(self) -> Outcome {
        match self {
            Slot::Ready(outcome) => outcome,
            Slot::Running {
                record_type,
                handle,
            } => handle.await.unwrap_or_else(|e| Outcome::Failed {
                record_type,
                id: None,
                error: ProcessError::ExtractionFailure(format!("record task failed: {e}")),
            }),
        }
    }

    fn abort(&self) {
        if let Slot::Running { handle, .. } = self {
            handle.abort();
        }
    }
}

/// Drives records from a source through the stages and commits outcomes
/// (counting, duplicate check, language verdict, output) in arrival order.
pub struct Pipeline {
    stages: Stages,
    detector: Option<Arc<DuplicateDetector>>,
    config: PipelineConfig,
    counters: Arc<RunCounters>,
    shutdown_token: CancellationToken,
}

impl Pipeline {
    pub fn new(extractor: Extractor, config: PipelineConfig) -> Self {
        let mut stages = Stages::new(extractor);
        stages.policy = config.policy;
        stages.refers_to_as_id = config.refers_to_as_id;
        stages.timeout = config.timeout;
        Self {
            stages,
            detector: None,
            config,
            counters: Arc::new(RunCounters::new()),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_detector(mut self, detector: Arc<DuplicateDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_language_filter(mut self, filter: LanguageFilter) -> Self {
        self.stages.language = Some(filter);
        self
    }

    pub fn with_fingerprint_rule(mut self, rule: FingerprintRule) -> Self {
        self.stages.fingerprint = rule;
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Process every record of `source`, writing decisions to `sink`.
    pub async fn run(
        &self,
        source: &mut dyn RecordSource,
        sink: &mut dyn DecisionSink,
    ) -> RunReport {
        info!(
            "Starting pipeline - concurrency: {}, timeout: {}ms, extractor: {}",
            self.config.concurrency,
            self.config.timeout.as_millis(),
            self.stages.extractor.html_strategy()
        );

        let mut aborted = self.drive(source, sink).await.err();
        if let Err(e) = sink.flush()
            && aborted.is_none()
        {
            aborted = Some(e.into());
        }

        let counters = self.counters.snapshot();
        let interrupted = self.shutdown_token.is_cancelled();
        match &aborted {
            Some(e) => error!("aborted after {}: {}", counters, e),
            None if interrupted => warn!("interrupted after {}", counters),
            None => info!("done, {}", counters),
        }

        RunReport {
            counters,
            interrupted,
            aborted,
        }
    }

    async fn drive(
        &self,
        source: &mut dyn RecordSource,
        sink: &mut dyn DecisionSink,
    ) -> Result<(), ProcessError> {
        let stages = Arc::new(self.stages.clone());
        let concurrency = self.config.concurrency.max(1);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut in_flight: VecDeque<Slot> = VecDeque::with_capacity(concurrency);

        let read_result = loop {
            if self.shutdown_token.is_cancelled() {
                info!("Shutdown requested, no further records are read");
                break Ok(());
            }

            let record = match source.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break Ok(()),
                Err(e) => break Err(ProcessError::from(e)),
            };

            let slot = match self.config.sample_ratio {
                Some(ratio) if rng.r#gen::<f64>() > ratio => Slot::Ready(Outcome::Skipped),
                _ => Slot::Running {
                    record_type: record.record_type,
                    handle: tokio::spawn(stages.clone().process(record)),
                },
            };
            in_flight.push_back(slot);

            while in_flight.len() >= concurrency {
                if let Some(slot) = in_flight.pop_front()
                    && let Err(e) = self.commit(slot.resolve().await, sink).await
                {
                    in_flight.iter().for_each(Slot::abort);
                    return Err(e);
                }
            }
        };

        // records already read are committed even when the source failed
        while let Some(slot) = in_flight.pop_front() {
            if let Err(e) = self.commit(slot.resolve().await, sink).await {
                in_flight.iter().for_each(Slot::abort);
                return Err(e);
            }
        }

        read_result
    }

    async fn commit(
        &self,
        outcome: Outcome,
        sink: &mut dyn DecisionSink,
    ) -> Result<(), ProcessError> {
        let counters = &self.counters;
        counters.incr(Counter::Total);

        let result = match outcome {
            Outcome::Skipped => {
                counters.incr(Counter::Skipped);
                Ok(())
            }
            Outcome::Excluded => Ok(()),
            Outcome::Failed {
                record_type,
                id,
                error,
            } => {
                self.count_type(record_type);
                self.record_failure(id.as_deref(), error)
            }
            Outcome::Processed { record_type, item } => {
                self.count_type(record_type);
                self.commit_processed(*item, sink).await
            }
        };

        let total = counters.get(Counter::Total);
        if self.config.progress_every > 0 && total % self.config.progress_every == 0 {
            info!("processed {}", counters.snapshot());
        }
        result
    }

    fn count_type(&self, record_type: RecordType) {
        match record_type {
            RecordType::Response => self.counters.incr(Counter::Responses),
            RecordType::Conversion => self.counters.incr(Counter::Conversions),
            RecordType::Other => {}
        }
    }

    fn record_failure(&self, id: Option<&str>, error: ProcessError) -> Result<(), ProcessError> {
        if error.is_fatal() {
            return Err(error);
        }
        let id = id.unwrap_or("<no id>");
        match error.failure_class() {
            FailureClass::Empty => {
                warn!("{}: {}", id, error);
                self.counters.incr(Counter::Empties);
            }
            FailureClass::Unsupported => {
                warn!("{}: {}", id, error);
                self.counters.incr(Counter::Unsupported);
            }
            FailureClass::Error => {
                error!("{}: {}", id, error);
                self.counters.incr(Counter::Errors);
            }
        }
        Ok(())
    }

    async fn commit_processed(
        &self,
        item: Processed,
        sink: &mut dyn DecisionSink,
    ) -> Result<(), ProcessError> {
        let id = item.id().to_string();

        if let Some(detector) = &self.detector
            && let DedupOutcome::DuplicateOf(original) =
                detector.check_and_record(&item.fingerprint, &id).await?
        {
            self.counters.incr(Counter::Duplicates);
            sink.emit(&Decision::Duplicate { id, original })?;
            return Ok(());
        }

        if let Some(decision) = item.language {
            sink.emit(&Decision::Language {
                id: id.clone(),
                decision,
            })?;
            if !decision.keep {
                self.counters.incr(Counter::Discarded);
                return Ok(());
            }
            self.counters.incr(Counter::Kept);
        }

        if self.config.emit_fingerprints {
            sink.emit(&Decision::Fingerprint {
                id: id.clone(),
                fingerprint: item.fingerprint,
            })?;
        }
        if self.config.emit_extracted {
            sink.emit(&Decision::Extracted(item.report()))?;
        }
        Ok(())
    }
}
