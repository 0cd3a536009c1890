//! Run results

use std::fmt;
use std::time::Duration;

use crate::pattern::Pattern;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A pattern unlocked the target
    Succeeded { pattern: Pattern, detail: Option<String> },

    /// Every pattern was attempted or already in the ledger
    Exhausted,

    /// Stopped by a shutdown request
    Interrupted,

    /// Stopped by a fatal handler error
    Aborted { reason: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Succeeded { pattern, .. } => write!(f, "succeeded with pattern {}", pattern),
            RunOutcome::Exhausted => write!(f, "exhausted without success"),
            RunOutcome::Interrupted => write!(f, "interrupted"),
            RunOutcome::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Patterns pulled from the enumerator
    pub seen: u64,
    /// Patterns already in the ledger
    pub skipped: u64,
    /// Patterns recorded by this run
    pub attempted: u64,
    pub failures: u64,
    pub unknown: u64,
    /// Handler invocations repeated after a transient error
    pub retries: u64,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStats,
    pub elapsed: Duration,
}
