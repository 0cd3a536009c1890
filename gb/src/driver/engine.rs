//! AttemptDriver - the brute-force control loop
//!
//! Pulls patterns in enumeration order, skips the ones the ledger already
//! has, spaces live invocations by the configured delay, retries transient
//! handler failures with exponential backoff and records every outcome
//! before moving on. The ledger is flushed on every exit path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eyre::{Context, Result, bail};
use patternledger::{AttemptLedger, AttemptOutcome};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::limiter::RateLimiter;
use super::report::{RunOutcome, RunReport, RunStats};
use crate::config::Config;
use crate::handler::{AttemptHandler, AttemptReport, HandlerError};
use crate::pattern::Pattern;
use crate::progress::ProgressState;

/// Whether attempts reach the outside world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    /// Rate-limited, handler results are authoritative
    Live,
    /// No delay; only observation-only handlers against a detached ledger
    DryRun,
}

/// Timing and retry policy
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Minimum spacing between live invocations
    pub delay: Duration,

    /// Extra invocations allowed after a transient failure
    pub max_retries: u32,

    /// Backoff before the first retry, doubled for each further retry
    pub initial_backoff: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl DriverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delay: Duration::from_millis(config.attempt.delay_ms),
            max_retries: config.attempt.max_retries,
            initial_backoff: Duration::from_millis(config.attempt.initial_backoff_ms),
        }
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Result of trying one pattern, including its retries
enum Attempt {
    Done(AttemptReport),
    /// Shutdown arrived; `in_flight` when the handler was mid-invocation
    Interrupted { in_flight: bool },
    Fatal(String),
}

pub struct AttemptDriver<H: AttemptHandler> {
    handler: H,
    ledger: AttemptLedger,
    settings: DriverSettings,
    mode: DriverMode,
    limiter: RateLimiter,
    progress: Arc<ProgressState>,
}

impl<H: AttemptHandler> AttemptDriver<H> {
    /// Create a driver
    ///
    /// Dry runs require an observation-only handler and a ledger that is not
    /// backed by a file; observation-only handlers are never driven live.
    pub fn new(handler: H, ledger: AttemptLedger, settings: DriverSettings, mode: DriverMode) -> Result<Self> {
        debug!(handler = handler.name(), ?mode, ?settings, "AttemptDriver::new: called");
        match mode {
            DriverMode::DryRun if !handler.is_observational() => {
                bail!("Handler '{}' changes external state and cannot be used for a dry run", handler.name());
            }
            DriverMode::DryRun if ledger.is_persistent() => {
                bail!("A dry run needs a detached ledger, got {:?}", ledger.path());
            }
            DriverMode::Live if handler.is_observational() => {
                bail!("Handler '{}' only observes and must be driven as a dry run", handler.name());
            }
            _ => {}
        }

        let limiter = RateLimiter::new(settings.delay);
        Ok(Self {
            handler,
            ledger,
            settings,
            mode,
            limiter,
            progress: Arc::new(ProgressState::new(None)),
        })
    }

    /// Share progress with a reporter
    pub fn with_progress(mut self, progress: Arc<ProgressState>) -> Self {
        self.progress = progress;
        self
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> AttemptLedger {
        self.ledger
    }

    /// Run until success, exhaustion, shutdown or a fatal handler error
    pub async fn run(
        &mut self,
        patterns: impl IntoIterator<Item = Pattern>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> Result<RunReport> {
        debug!(mode = ?self.mode, handler = self.handler.name(), "AttemptDriver::run: called");
        info!(
            handler = self.handler.name(),
            mode = ?self.mode,
            recorded = self.ledger.len(),
            "Starting brute-force run"
        );
        let start = Instant::now();
        let mut stats = RunStats::default();

        let result = self.drive(patterns.into_iter(), &mut shutdown, &mut stats).await;
        self.progress.finish();
        let flushed = self.ledger.flush().context("Failed to flush ledger");

        let outcome = result?;
        flushed?;

        let report = RunReport {
            outcome,
            stats,
            elapsed: start.elapsed(),
        };
        info!(outcome = %report.outcome, ?report.stats, "Run finished");
        Ok(report)
    }

    async fn drive(
        &mut self,
        patterns: impl Iterator<Item = Pattern>,
        shutdown: &mut mpsc::Receiver<()>,
        stats: &mut RunStats,
    ) -> Result<RunOutcome> {
        for pattern in patterns {
            if shutdown_requested(shutdown) {
                info!("Shutdown requested");
                return Ok(RunOutcome::Interrupted);
            }

            stats.seen += 1;
            let key = pattern.key();
            if self.ledger.has(key) {
                debug!(%key, "AttemptDriver::drive: already attempted, skipping");
                stats.skipped += 1;
                self.progress.record_skip();
                continue;
            }

            match self.attempt(&pattern, shutdown, stats).await {
                Attempt::Done(report) => {
                    self.record(&pattern, &report, stats)?;
                    if report.outcome.is_success() {
                        return Ok(RunOutcome::Succeeded {
                            pattern,
                            detail: report.detail,
                        });
                    }
                }
                Attempt::Interrupted { in_flight } => {
                    info!(%key, in_flight, "Shutdown requested during attempt");
                    if in_flight {
                        self.record(&pattern, &AttemptReport::unknown("interrupted"), stats)?;
                    }
                    return Ok(RunOutcome::Interrupted);
                }
                Attempt::Fatal(reason) => {
                    error!(%key, %reason, "Fatal handler error, aborting run");
                    return Ok(RunOutcome::Aborted { reason });
                }
            }
        }

        if stats.seen == 0 {
            warn!("No patterns to try: the constraints admit none");
        }
        Ok(RunOutcome::Exhausted)
    }

    /// Invoke the handler for one pattern, retrying transient failures
    async fn attempt(&mut self, pattern: &Pattern, shutdown: &mut mpsc::Receiver<()>, stats: &mut RunStats) -> Attempt {
        let live = self.mode == DriverMode::Live;
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = self.settings.backoff(attempt);
                stats.retries += 1;
                warn!(key = %pattern.key(), attempt, backoff_ms = backoff.as_millis() as u64, "Retrying after transient error");
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    Some(()) = shutdown.recv() => return Attempt::Interrupted { in_flight: false },
                }
            }

            if live {
                tokio::select! {
                    _ = self.limiter.wait() => {}
                    Some(()) = shutdown.recv() => return Attempt::Interrupted { in_flight: false },
                }
            }

            let result = tokio::select! {
                result = self.handler.attempt(pattern) => Some(result),
                Some(()) = shutdown.recv() => None,
            };
            if live {
                self.limiter.mark();
            }
            let Some(result) = result else {
                return Attempt::Interrupted { in_flight: true };
            };

            match result {
                Ok(report) => return Attempt::Done(report),
                Err(HandlerError::Fatal(reason)) => return Attempt::Fatal(reason),
                Err(e @ HandlerError::Transient(_)) => {
                    debug!(key = %pattern.key(), error = %e, "AttemptDriver::attempt: transient failure");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map_or_else(|| "no result".to_string(), |e| e.to_string());
        warn!(key = %pattern.key(), %reason, "Giving up on pattern after retries");
        Attempt::Done(AttemptReport::unknown(format!(
            "gave up after {} retries: {}",
            self.settings.max_retries, reason
        )))
    }

    fn record(&mut self, pattern: &Pattern, report: &AttemptReport, stats: &mut RunStats) -> Result<()> {
        let key = pattern.key();
        match report.outcome {
            AttemptOutcome::Success => info!(%key, detail = ?report.detail, "Pattern succeeded"),
            AttemptOutcome::Failure => debug!(%key, detail = ?report.detail, "AttemptDriver::record: pattern failed"),
            AttemptOutcome::Unknown => warn!(%key, detail = ?report.detail, "Pattern outcome unknown"),
        }

        self.ledger
            .record(key, report.outcome, Utc::now())
            .with_context(|| format!("Failed to record attempt for {}", key))?;
        stats.attempted += 1;
        match report.outcome {
            AttemptOutcome::Failure => stats.failures += 1,
            AttemptOutcome::Unknown => stats.unknown += 1,
            AttemptOutcome::Success => {}
        }
        self.progress.record_attempt(key, report.outcome);
        Ok(())
    }
}

/// Non-blocking check for a pending shutdown request
fn shutdown_requested(shutdown: &mut mpsc::Receiver<()>) -> bool {
    match shutdown.try_recv() {
        Ok(()) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
    }
}
