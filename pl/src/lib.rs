//! PatternLedger - append-only record of attempted unlock patterns
//!
//! A brute-force session can run for days against a device that enforces a
//! lockout window between attempts. The ledger is what makes such a session
//! resumable: every attempt is appended (and synced) before the next one
//! starts, and on restart the ledger is replayed to rebuild the set of
//! patterns that must not be tried again.
//!
//! # File format
//!
//! ```text
//! 1235,failure,2026-10-19T08:15:02.114Z
//! 12354,failure,2026-10-19T08:15:33.270Z
//! 123547,unknown,2026-10-19T08:16:04.981Z
//! ```
//!
//! One record per line: `pattern_key,outcome,timestamp`. The file is only
//! ever appended to. Writers hold an exclusive `fs2` lock for a single
//! append, readers hold a shared lock for a single read pass.
//!
//! # Example
//!
//! ```ignore
//! use patternledger::{AttemptLedger, AttemptOutcome};
//!
//! let mut ledger = AttemptLedger::load("paths_log.csv")?;
//! if !ledger.has("1235") {
//!     ledger.record("1235", AttemptOutcome::Failure, chrono::Utc::now())?;
//! }
//! ledger.flush()?;
//! ```

mod error;
mod ledger;
mod record;

pub use error::{LedgerError, ParseError};
pub use ledger::{AttemptLedger, LedgerSummary, LoadStats, read_records};
pub use record::{AttemptOutcome, AttemptRecord, TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};
