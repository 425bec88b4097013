use serde::Serialize;
use std::io::{self, Write};

use crate::dedup::Fingerprint;
use crate::language::LanguageDecision;

/// Provenance carried alongside extracted text in JSONL output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub uri: Option<String>,
    pub source_type: Option<String>,
    pub download_date: Option<String>,
    pub source_length: Option<u64>,
    pub extractor: String,
    pub best_effort: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub id: String,
    pub text: String,
    pub meta: ReportMeta,
}

/// One line of pipeline output.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Duplicate { id: String, original: String },
    Language { id: String, decision: LanguageDecision },
    Fingerprint { id: String, fingerprint: Fingerprint },
    Extracted(ExtractionReport),
}

impl Decision {
    pub fn id(&self) -> &str {
        match self {
            Decision::Duplicate { id, .. }
            | Decision::Language { id, .. }
            | Decision::Fingerprint { id, .. } => id,
            Decision::Extracted(report) => &report.id,
        }
    }
}

/// Where decisions go, one call per decision in record order.
pub trait DecisionSink: Send {
    fn emit(&mut self, decision: &Decision) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects decisions in memory.
impl DecisionSink for Vec<Decision> {
    fn emit(&mut self, decision: &Decision) -> io::Result<()> {
        self.push(decision.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Jsonl,
    TextOnly,
}

/// Tab-separated decision lines, with extraction reports as JSONL or bare text.
pub struct LineSink<W> {
    out: W,
    format: TextFormat,
    id_prefix: String,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            format: TextFormat::default(),
            id_prefix: String::new(),
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    /// Prefix for ids in extraction reports, e.g. `commoncrawl:`
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_report(&mut self, report: &ExtractionReport) -> io::Result<()> {
        match self.format {
            TextFormat::TextOnly => writeln!(self.out, "{}", report.text),
            TextFormat::Jsonl => {
                if self.id_prefix.is_empty() {
                    serde_json::to_writer(&mut self.out, report)?;
                } else {
                    let prefixed = ExtractionReport {
                        id: format!("{}{}", self.id_prefix, report.id),
                        ..report.clone()
                    };
                    serde_json::to_writer(&mut self.out, &prefixed)?;
                }
                writeln!(self.out)
            }
        }
    }
}

impl<W: Write + Send> DecisionSink for LineSink<W> {
    fn emit(&mut self, decision: &Decision) -> io::Result<()> {
        match decision {
            Decision::Duplicate { id, original } => writeln!(self.out, "{id}\t{original}"),
            Decision::Language { id, decision } => writeln!(
                self.out,
                "{id}\t{}\t{}\t{}",
                decision.target_word_count, decision.total_word_count, decision.keep
            ),
            Decision::Fingerprint { id, fingerprint } => {
                writeln!(self.out, "{id}\t{fingerprint}")
            }
            Decision::Extracted(report) => self.write_report(report),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
