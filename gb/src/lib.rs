//! gapbf - resumable Android lock-pattern brute forcing
//!
//! Enumerates every unlock pattern a constraint set admits on a lock-screen
//! grid and feeds them, one at a time and rate limited, to an attempt
//! handler. Every attempt is recorded in an append-only ledger so an
//! interrupted session resumes where it stopped without repeating work.
//!
//! # Modules
//!
//! - [`grid`] - Grid node tables and adjacency
//! - [`constraints`] - Prefix, suffix, exclusion and length limits
//! - [`enumerator`] - Depth-first pattern enumeration
//! - [`handler`] - Attempt handlers (device, simulated, observers)
//! - [`driver`] - The rate-limited attempt loop
//! - [`progress`] - Shared progress counters and reporter
//! - [`render`] - Text rendering of patterns on the grid
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod constraints;
pub mod driver;
pub mod enumerator;
pub mod grid;
pub mod handler;
pub mod pattern;
pub mod progress;
pub mod render;

// Re-export commonly used types
pub use config::Config;
pub use constraints::{ConstraintError, ConstraintSet};
pub use driver::{AttemptDriver, DriverMode, DriverSettings, RunOutcome, RunReport, RunStats};
pub use enumerator::PathEnumerator;
pub use grid::{GridError, GridGraph, NodeId};
pub use handler::{AttemptHandler, AttemptReport, Handler, HandlerError, HandlerKind};
pub use pattern::Pattern;
pub use progress::{ProgressSnapshot, ProgressState};
pub use patternledger::{AttemptLedger, AttemptOutcome};
