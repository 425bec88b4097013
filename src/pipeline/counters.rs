use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Total,
    Responses,
    Conversions,
    Empties,
    Unsupported,
    Errors,
    Skipped,
    Duplicates,
    Kept,
    Discarded,
}

impl Counter {
    pub const ALL: [Counter; 10] = [
        Counter::Total,
        Counter::Responses,
        Counter::Conversions,
        Counter::Empties,
        Counter::Unsupported,
        Counter::Errors,
        Counter::Skipped,
        Counter::Duplicates,
        Counter::Kept,
        Counter::Discarded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::Total => "total",
            Counter::Responses => "responses",
            Counter::Conversions => "conversions",
            Counter::Empties => "empties",
            Counter::Unsupported => "unsupported",
            Counter::Errors => "errors",
            Counter::Skipped => "skipped",
            Counter::Duplicates => "duplicates",
            Counter::Kept => "kept",
            Counter::Discarded => "discarded",
        }
    }
}

/// Run-wide outcome counters. Increments are atomic so workers may share one
/// instance; only final totals are meaningful across threads.
#[derive(Debug, Default)]
pub struct RunCounters {
    values: [AtomicU64; 10],
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, counter: Counter) {
        self.values[counter as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.get(Counter::Total),
            responses: self.get(Counter::Responses),
            conversions: self.get(Counter::Conversions),
            empties: self.get(Counter::Empties),
            unsupported: self.get(Counter::Unsupported),
            errors: self.get(Counter::Errors),
            skipped: self.get(Counter::Skipped),
            duplicates: self.get(Counter::Duplicates),
            kept: self.get(Counter::Kept),
            discarded: self.get(Counter::Discarded),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub total: u64,
    pub responses: u64,
    pub conversions: u64,
    pub empties: u64,
    pub unsupported: u64,
    pub errors: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub kept: u64,
    pub discarded: u64,
}

impl CounterSnapshot {
    pub fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Total => self.total,
            Counter::Responses => self.responses,
            Counter::Conversions => self.conversions,
            Counter::Empties => self.empties,
            Counter::Unsupported => self.unsupported,
            Counter::Errors => self.errors,
            Counter::Skipped => self.skipped,
            Counter::Duplicates => self.duplicates,
            Counter::Kept => self.kept,
            Counter::Discarded => self.discarded,
        }
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} skipped, {} responses, {} conversions, \
             {} with empty text content, {} with unsupported type, {} errors, \
             {} duplicates, {} kept, {} discarded",
            self.total,
            self.skipped,
            self.responses,
            self.conversions,
            self.empties,
            self.unsupported,
            self.errors,
            self.duplicates,
            self.kept,
            self.discarded,
        )
    }
}
