//! Integration tests for resuming an interrupted run
//!
//! A run is stopped partway through, the ledger is reopened from disk and a
//! second run picks up at the first unrecorded pattern.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gapbf::{
    AttemptDriver, AttemptHandler, AttemptLedger, AttemptOutcome, AttemptReport, ConstraintSet, DriverMode,
    DriverSettings, GridGraph, HandlerError, PathEnumerator, Pattern, RunOutcome,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Fails every pattern, optionally asking for shutdown after a number of attempts
struct StoppingHandler {
    calls: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    stop_after: Option<(usize, mpsc::Sender<()>)>,
    secret: Option<String>,
}

impl StoppingHandler {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            stop_after: None,
            secret: None,
        }
    }

    fn stop_after(mut self, count: usize, tx: mpsc::Sender<()>) -> Self {
        self.stop_after = Some((count, tx));
        self
    }

    fn with_secret(mut self, key: &str) -> Self {
        self.secret = Some(key.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttemptHandler for StoppingHandler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        self.calls.lock().unwrap().push(pattern.key().to_string());
        let done = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, tx)) = &self.stop_after
            && done == *count
        {
            let _ = tx.try_send(());
        }
        if self.secret.as_deref() == Some(pattern.key()) {
            Ok(AttemptReport::success())
        } else {
            Ok(AttemptReport::failure())
        }
    }

    fn name(&self) -> &'static str {
        "stopping"
    }
}

fn patterns(constraints: &ConstraintSet) -> PathEnumerator {
    let graph = Arc::new(GridGraph::build(3).expect("Failed to build grid"));
    PathEnumerator::new(graph, constraints).expect("Failed to build enumerator")
}

fn constraints() -> ConstraintSet {
    ConstraintSet::new(4, 5).with_prefix(["5"])
}

fn settings() -> DriverSettings {
    DriverSettings {
        max_retries: 0,
        ..Default::default()
    }
}

// =============================================================================
// Resume Tests
// =============================================================================

#[tokio::test]
async fn test_interrupted_run_resumes_at_first_unrecorded_pattern() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ledger_path = temp_dir.path().join("paths_log.csv");
    let all: Vec<String> = patterns(&constraints()).map(|p| p.key().to_string()).collect();
    assert!(all.len() > 20, "need a search space larger than the first run");

    // First run stops after ten attempts
    let (tx, rx) = mpsc::channel(1);
    let ledger = AttemptLedger::load(&ledger_path).expect("Failed to open ledger");
    let handler = StoppingHandler::new().stop_after(10, tx);
    let mut driver = AttemptDriver::new(handler, ledger, settings(), DriverMode::Live).expect("Failed to build driver");
    let report = driver
        .run(patterns(&constraints()), rx)
        .await
        .expect("First run failed");
    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.stats.attempted, 10);
    assert_eq!(driver.ledger().len(), 10);
    drop(driver);

    // Second run starts from the reopened ledger
    let (_tx, rx) = mpsc::channel(1);
    let ledger = AttemptLedger::load(&ledger_path).expect("Failed to reopen ledger");
    assert_eq!(ledger.len(), 10);
    let handler = Arc::new(StoppingHandler::new());
    let mut driver = AttemptDriver::new(SharedHandler(Arc::clone(&handler)), ledger, settings(), DriverMode::Live)
        .expect("Failed to build driver");
    let report = driver
        .run(patterns(&constraints()), rx)
        .await
        .expect("Second run failed");

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.stats.skipped, 10);
    assert_eq!(handler.calls(), all[10..].to_vec());

    // Every pattern is on disk exactly once, in enumeration order
    let (records, stats) = patternledger::read_records(&ledger_path).expect("Failed to read ledger");
    let keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys, all);
    assert_eq!(stats.duplicates, 0);
    assert_eq!(stats.malformed, 0);
    assert!(records.iter().all(|r| r.outcome == AttemptOutcome::Failure));
}

#[tokio::test]
async fn test_success_is_persisted_and_found_on_reload() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ledger_path = temp_dir.path().join("paths_log.csv");
    let all: Vec<String> = patterns(&constraints()).map(|p| p.key().to_string()).collect();
    let secret = all[3].clone();

    let (_tx, rx) = mpsc::channel(1);
    let ledger = AttemptLedger::load(&ledger_path).expect("Failed to open ledger");
    let handler = StoppingHandler::new().with_secret(&secret);
    let mut driver = AttemptDriver::new(handler, ledger, settings(), DriverMode::Live).expect("Failed to build driver");
    let report = driver
        .run(patterns(&constraints()), rx)
        .await
        .expect("Run failed");

    match report.outcome {
        RunOutcome::Succeeded { pattern, .. } => assert_eq!(pattern.key(), secret),
        other => panic!("expected success, got {:?}", other),
    }
    drop(driver);

    let reloaded = AttemptLedger::load(&ledger_path).expect("Failed to reopen ledger");
    assert_eq!(reloaded.len(), 4);
    let summary = reloaded.summary();
    assert_eq!(summary.success, 1);
    assert_eq!(summary.failure, 3);
    assert_eq!(summary.winning.map(|w| w.key), Some(secret));
}

#[tokio::test]
async fn test_dry_run_leaves_ledger_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ledger_path = temp_dir.path().join("paths_log.csv");
    std::fs::write(&ledger_path, "5123,failure,2026-10-19T08:15:02.114Z\n").expect("Failed to seed ledger");

    let (_tx, rx) = mpsc::channel(1);
    let snapshot = AttemptLedger::snapshot(&ledger_path).expect("Failed to read ledger");
    let mut driver = AttemptDriver::new(
        gapbf::handler::DryRunHandler::new(),
        snapshot,
        settings(),
        DriverMode::DryRun,
    )
    .expect("Failed to build driver");
    let report = driver
        .run(patterns(&constraints()), rx)
        .await
        .expect("Dry run failed");

    assert_eq!(report.outcome, RunOutcome::Exhausted);
    assert_eq!(report.stats.skipped, 1);
    let content = std::fs::read_to_string(&ledger_path).expect("Failed to read ledger");
    assert_eq!(content.lines().count(), 1);
}

/// Lets the test keep a handle on a handler the driver owns
struct SharedHandler(Arc<StoppingHandler>);

#[async_trait]
impl AttemptHandler for SharedHandler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        self.0.attempt(pattern).await
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }
}
