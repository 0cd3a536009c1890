//! Run progress shared between the driver and a background reporter
//!
//! The driver is the only writer. The reporter task reads a snapshot on a
//! fixed interval and prints one line; nothing it does can affect the run.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use colored::Colorize;
use patternledger::AttemptOutcome;
use tokio::task::JoinHandle;
use tracing::debug;

/// Thread-safe progress counters
#[derive(Debug, Default)]
pub struct ProgressState {
    /// Size of the search space (0 when not known)
    total: AtomicU64,

    /// Patterns pulled from the enumerator
    seen: AtomicU64,

    /// Patterns skipped because the ledger already had them
    skipped: AtomicU64,

    /// Handler invocations that produced a record
    attempted: AtomicU64,

    /// Attempts recorded as `unknown`
    unknown: AtomicU64,

    last_key: RwLock<Option<String>>,

    finished: AtomicBool,
}

/// Point-in-time copy of [`ProgressState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: Option<u64>,
    pub seen: u64,
    pub skipped: u64,
    pub attempted: u64,
    pub unknown: u64,
    pub last_key: Option<String>,
}

impl ProgressState {
    pub fn new(total: Option<u64>) -> Self {
        debug!(?total, "ProgressState::new: called");
        Self {
            total: AtomicU64::new(total.unwrap_or(0)),
            ..Default::default()
        }
    }

    pub fn record_skip(&self) {
        self.seen.fetch_add(1, Ordering::Relaxed);
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self, key: &str, outcome: AttemptOutcome) {
        self.seen.fetch_add(1, Ordering::Relaxed);
        self.attempted.fetch_add(1, Ordering::Relaxed);
        if outcome == AttemptOutcome::Unknown {
            self.unknown.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut last) = self.last_key.write() {
            *last = Some(key.to_string());
        }
    }

    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        ProgressSnapshot {
            total: (total > 0).then_some(total),
            seen: self.seen.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            attempted: self.attempted.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            last_key: self.last_key.read().ok().and_then(|last| last.clone()),
        }
    }
}

impl ProgressSnapshot {
    /// Percentage of the search space covered, if the total is known
    pub fn percent(&self) -> Option<f64> {
        self.total.map(|total| self.seen as f64 * 100.0 / total as f64)
    }

    /// Single-line human-readable form
    pub fn line(&self) -> String {
        let position = match (self.total, self.percent()) {
            (Some(total), Some(percent)) => format!("{} of {} ({:.1}%)", self.seen, total, percent),
            _ => self.seen.to_string(),
        };
        let mut line = format!(
            "Pattern {}: {} attempted, {} skipped",
            position, self.attempted, self.skipped
        );
        if self.unknown > 0 {
            line.push_str(&format!(", {} unknown", self.unknown));
        }
        if let Some(key) = &self.last_key {
            line.push_str(&format!(", last {}", key));
        }
        line
    }
}

/// Print a progress line every `interval` until the run finishes
pub fn spawn_reporter(state: std::sync::Arc<ProgressState>, interval: Duration) -> JoinHandle<()> {
    debug!(interval_ms = interval.as_millis() as u64, "spawn_reporter: called");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if state.is_finished() {
                debug!("spawn_reporter: run finished");
                break;
            }
            println!("{} {}", "[progress]".cyan(), state.snapshot().line());
        }
    })
}
