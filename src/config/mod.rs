//! Runtime configuration for the sift tools.
//!
//! Every option is read from a `SIFT_*` environment variable by
//! [`Config::from_env`], falling back to the defaults below. Values are
//! validated up front so a bad threshold fails before any record is read.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::classify::UnknownTypePolicy;
use crate::extractor::{RANDOM_STRATEGY, StrategyRegistry};
use crate::language::{DEFAULT_WORD_PATTERN, Thresholds, WordPattern};
use crate::pipeline::PipelineConfig;

pub const ENV_TARGET_LANGUAGE: &str = "SIFT_TARGET_LANGUAGE";
pub const ENV_MIN_RATIO: &str = "SIFT_MIN_RATIO";
pub const ENV_KEEP_WORD_COUNT: &str = "SIFT_KEEP_WORD_COUNT";
pub const ENV_KEEP_RATIO: &str = "SIFT_KEEP_RATIO";
pub const ENV_LANG_PROBABILITY: &str = "SIFT_LANG_PROBABILITY";
pub const ENV_MIN_LINE_WORDS: &str = "SIFT_MIN_LINE_WORDS";
pub const ENV_WORD_PATTERN: &str = "SIFT_WORD_PATTERN";
pub const ENV_EXTRACTOR: &str = "SIFT_EXTRACTOR";
pub const ENV_REFERS_TO: &str = "SIFT_REFERS_TO";
pub const ENV_SAMPLE: &str = "SIFT_SAMPLE";
pub const ENV_SEED: &str = "SIFT_SEED";
pub const ENV_DB: &str = "SIFT_DB";
pub const ENV_PROGRESS_EVERY: &str = "SIFT_PROGRESS_EVERY";
pub const ENV_TIMEOUT_MS: &str = "SIFT_TIMEOUT_MS";
pub const ENV_CONCURRENCY: &str = "SIFT_CONCURRENCY";
pub const ENV_TRY_ANYWAY: &str = "SIFT_TRY_ANYWAY";
pub const ENV_LETTERS_ONLY_HASH: &str = "SIFT_LETTERS_ONLY_HASH";
pub const ENV_TEXT_ONLY: &str = "SIFT_TEXT_ONLY";
pub const ENV_ID_PREFIX: &str = "SIFT_ID_PREFIX";

const DEFAULT_TARGET_LANGUAGE: &str = "fin";
const DEFAULT_EXTRACTOR: &str = "dom";
const DEFAULT_DB: &str = "fingerprints.db";
const DEFAULT_PROGRESS_EVERY: u64 = 1000;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CONCURRENCY: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    target_language: String,
    thresholds: Thresholds,
    word_pattern: String,
    extractor: String,
    refers_to_as_id: bool,
    sample_ratio: Option<f64>,
    seed: Option<u64>,
    db_path: PathBuf,
    progress_every: u64,
    timeout_ms: u64,
    concurrency: usize,
    try_anyway: bool,
    letters_only_hash: bool,
    text_only: bool,
    id_prefix: Option<String>,
}

impl Config {
    /// Load from environment variables, falling back to defaults, and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Thresholds::default();
        let config = Self {
            target_language: env::var(ENV_TARGET_LANGUAGE)
                .unwrap_or_else(|_| DEFAULT_TARGET_LANGUAGE.to_string()),
            thresholds: Thresholds {
                min_ratio: parse_var(ENV_MIN_RATIO, "min_ratio")?
                    .unwrap_or(defaults.min_ratio),
                keep_word_count: parse_var(ENV_KEEP_WORD_COUNT, "keep_word_count")?
                    .unwrap_or(defaults.keep_word_count),
                keep_ratio: parse_var(ENV_KEEP_RATIO, "keep_ratio")?
                    .unwrap_or(defaults.keep_ratio),
                probability: parse_var(ENV_LANG_PROBABILITY, "probability")?
                    .unwrap_or(defaults.probability),
                min_line_words: parse_var(ENV_MIN_LINE_WORDS, "min_line_words")?
                    .unwrap_or(defaults.min_line_words),
            },
            word_pattern: env::var(ENV_WORD_PATTERN)
                .unwrap_or_else(|_| DEFAULT_WORD_PATTERN.to_string()),
            extractor: env::var(ENV_EXTRACTOR)
                .unwrap_or_else(|_| DEFAULT_EXTRACTOR.to_string()),
            refers_to_as_id: parse_flag(ENV_REFERS_TO, "refers_to_as_id")?,
            sample_ratio: parse_var(ENV_SAMPLE, "sample_ratio")?,
            seed: parse_var(ENV_SEED, "seed")?,
            db_path: env::var(ENV_DB)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB)),
            progress_every: parse_var(ENV_PROGRESS_EVERY, "progress_every")?
                .unwrap_or(DEFAULT_PROGRESS_EVERY),
            timeout_ms: parse_var(ENV_TIMEOUT_MS, "timeout_ms")?
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            concurrency: parse_var(ENV_CONCURRENCY, "concurrency")?
                .unwrap_or(DEFAULT_CONCURRENCY),
            try_anyway: parse_flag(ENV_TRY_ANYWAY, "try_anyway")?,
            letters_only_hash: parse_flag(ENV_LETTERS_ONLY_HASH, "letters_only_hash")?,
            text_only: parse_flag(ENV_TEXT_ONLY, "text_only")?,
            id_prefix: env::var(ENV_ID_PREFIX).ok().filter(|p| !p.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and that the word pattern and strategy name resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        check_unit("min_ratio", t.min_ratio)?;
        check_unit("keep_ratio", t.keep_ratio)?;
        check_unit("probability", t.probability)?;
        if let Some(ratio) = self.sample_ratio {
            check_unit("sample_ratio", ratio)?;
        }
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("concurrency", "must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("timeout_ms", "must be positive"));
        }
        if self.target_language.trim().is_empty() {
            return Err(ConfigError::invalid("target_language", "must not be empty"));
        }
        WordPattern::new(&self.word_pattern)
            .map_err(|e| ConfigError::invalid("word_pattern", e.to_string()))?;

        let registry = StrategyRegistry::with_defaults();
        if self.extractor != RANDOM_STRATEGY && registry.get(&self.extractor).is_none() {
            return Err(ConfigError::invalid(
                "extractor",
                format!(
                    "unknown strategy '{}', expected one of {:?} or '{}'",
                    self.extractor,
                    registry.names(),
                    RANDOM_STRATEGY
                ),
            ));
        }
        Ok(())
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }
    /// Compiled word-boundary rule. Validated at load time.
    pub fn word_pattern(&self) -> Result<WordPattern, ConfigError> {
        WordPattern::new(&self.word_pattern)
            .map_err(|e| ConfigError::invalid("word_pattern", e.to_string()))
    }
    /// HTML extraction strategy name (or `random`).
    pub fn extractor(&self) -> &str {
        &self.extractor
    }
    /// Use `WARC-Refers-To` instead of `WARC-Record-ID` (WET files).
    pub fn refers_to_as_id(&self) -> bool {
        self.refers_to_as_id
    }
    pub fn sample_ratio(&self) -> Option<f64> {
        self.sample_ratio
    }
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
    /// Fingerprint store location.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
    pub fn progress_every(&self) -> u64 {
        self.progress_every
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
    pub fn unknown_type_policy(&self) -> UnknownTypePolicy {
        if self.try_anyway {
            UnknownTypePolicy::TryAnyway
        } else {
            UnknownTypePolicy::Reject
        }
    }
    pub fn letters_only_hash(&self) -> bool {
        self.letters_only_hash
    }
    pub fn text_only(&self) -> bool {
        self.text_only
    }
    pub fn id_prefix(&self) -> Option<&str> {
        self.id_prefix.as_deref()
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_extractor(mut self, name: impl Into<String>) -> Self {
        self.extractor = name.into();
        self
    }

    pub fn with_refers_to_as_id(mut self, enabled: bool) -> Self {
        self.refers_to_as_id = enabled;
        self
    }

    pub fn with_sample_ratio(mut self, ratio: f64) -> Self {
        self.sample_ratio = Some(ratio);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_try_anyway(mut self, enabled: bool) -> Self {
        self.try_anyway = enabled;
        self
    }

    pub fn with_letters_only_hash(mut self, enabled: bool) -> Self {
        self.letters_only_hash = enabled;
        self
    }

    pub fn with_text_only(mut self, enabled: bool) -> Self {
        self.text_only = enabled;
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.id_prefix = Some(prefix).filter(|p| !p.is_empty());
        self
    }

    /// Pipeline settings shared by every tool; callers pick what to emit.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.concurrency,
            progress_every: self.progress_every,
            timeout: self.timeout(),
            sample_ratio: self.sample_ratio,
            seed: self.seed,
            refers_to_as_id: self.refers_to_as_id,
            policy: self.unknown_type_policy(),
            emit_fingerprints: false,
            emit_extracted: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            thresholds: Thresholds::default(),
            word_pattern: DEFAULT_WORD_PATTERN.to_string(),
            extractor: DEFAULT_EXTRACTOR.to_string(),
            refers_to_as_id: false,
            sample_ratio: None,
            seed: None,
            db_path: PathBuf::from(DEFAULT_DB),
            progress_every: DEFAULT_PROGRESS_EVERY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
            try_anyway: false,
            letters_only_hash: false,
            text_only: false,
            id_prefix: None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, field: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::invalid(field, format!("{raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn parse_flag(key: &str, field: &'static str) -> Result<bool, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            other => Err(ConfigError::invalid(field, format!("not a boolean: {other:?}"))),
        },
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")))
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
