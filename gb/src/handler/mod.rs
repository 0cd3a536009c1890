//! Attempt handlers
//!
//! An attempt handler tests a single pattern against something: a real
//! device over ADB, a known secret, or nothing at all. The driver only
//! sees the [`AttemptHandler`] trait; the concrete variant is picked once at
//! startup from a [`HandlerKind`] and wrapped in the closed [`Handler`] enum.

mod adb;
mod dry_run;
mod error;
mod print;
mod simulated;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context, Result};
use patternledger::AttemptOutcome;
use tracing::debug;

pub use adb::{AdbHandler, AdbSettings};
pub use dry_run::DryRunHandler;
pub use error::HandlerError;
pub use print::PrintHandler;
pub use simulated::SimulatedHandler;

use crate::config::Config;
use crate::grid::GridGraph;
use crate::pattern::Pattern;

/// What a handler reports for one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub outcome: AttemptOutcome,

    /// Free-form context (device output, reason for `unknown`)
    pub detail: Option<String>,
}

impl AttemptReport {
    pub fn success() -> Self {
        Self {
            outcome: AttemptOutcome::Success,
            detail: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            outcome: AttemptOutcome::Failure,
            detail: None,
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self {
            outcome: AttemptOutcome::Unknown,
            detail: Some(detail.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Capability to test one pattern
///
/// Implementations must not touch the ledger and must be safe to call
/// repeatedly.
#[async_trait]
pub trait AttemptHandler: Send + Sync {
    /// Test `pattern`, classifying the result
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError>;

    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Observation-only handlers never change external state and are only
    /// ever driven in dry-run mode
    fn is_observational(&self) -> bool {
        false
    }
}

/// Handler selector, chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HandlerKind {
    /// Real device through `adb shell twrp decrypt`
    Adb,
    /// Simulated device that only accepts the configured test pattern
    Test,
    /// Render each pattern on the grid; attempts nothing
    Print,
    /// Log each would-be attempt; attempts nothing
    DryRun,
}

impl HandlerKind {
    /// The kind used instead of this one when `--dry-run` is given
    pub fn for_dry_run(self) -> Self {
        match self {
            HandlerKind::Print => HandlerKind::Print,
            _ => HandlerKind::DryRun,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerKind::Adb => "adb",
            HandlerKind::Test => "test",
            HandlerKind::Print => "print",
            HandlerKind::DryRun => "dry-run",
        };
        f.write_str(name)
    }
}

/// The closed set of handler variants
pub enum Handler {
    Adb(AdbHandler),
    Simulated(SimulatedHandler),
    Print(PrintHandler),
    DryRun(DryRunHandler),
}

impl Handler {
    /// Construct the handler for `kind` from the resolved configuration
    pub async fn create(kind: HandlerKind, config: &Config, graph: &Arc<GridGraph>) -> Result<Self> {
        debug!(%kind, "Handler::create: called");
        let handler = match kind {
            HandlerKind::Adb => {
                let settings = AdbSettings::from_config(config);
                Handler::Adb(AdbHandler::start(settings).await.context("Failed to start ADB")?)
            }
            HandlerKind::Test => {
                let secret = config
                    .test_pattern(graph)
                    .context("Invalid test.path in configuration")?;
                Handler::Simulated(SimulatedHandler::new(secret))
            }
            HandlerKind::Print => Handler::Print(PrintHandler::new(Arc::clone(graph))),
            HandlerKind::DryRun => Handler::DryRun(DryRunHandler::new()),
        };
        Ok(handler)
    }

    fn inner(&self) -> &dyn AttemptHandler {
        match self {
            Handler::Adb(h) => h,
            Handler::Simulated(h) => h,
            Handler::Print(h) => h,
            Handler::DryRun(h) => h,
        }
    }
}

#[async_trait]
impl AttemptHandler for Handler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        self.inner().attempt(pattern).await
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn is_observational(&self) -> bool {
        self.inner().is_observational()
    }
}

#[cfg(test)]
pub mod mock {
    //! Scripted handler for driver tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted response for one invocation
    pub type Scripted = Result<AttemptReport, HandlerError>;

    /// Handler that replays scripted responses, then answers `failure`
    ///
    /// A `secret` key answers `success` regardless of the script.
    #[derive(Default)]
    pub struct MockHandler {
        script: Mutex<VecDeque<Scripted>>,
        secret: Option<String>,
        calls: Mutex<Vec<String>>,
        observational: bool,
    }

    impl MockHandler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_secret(mut self, key: &str) -> Self {
            self.secret = Some(key.to_string());
            self
        }

        pub fn with_script(self, script: impl IntoIterator<Item = Scripted>) -> Self {
            self.script.lock().unwrap().extend(script);
            self
        }

        pub fn observational(mut self) -> Self {
            self.observational = true;
            self
        }

        /// Keys attempted so far, in order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AttemptHandler for MockHandler {
        async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
            self.calls.lock().unwrap().push(pattern.key().to_string());
            if self.secret.as_deref() == Some(pattern.key()) {
                return Ok(AttemptReport::success());
            }
            let scripted = self.script.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| Ok(AttemptReport::failure()))
        }

        fn name(&self) -> &'static str {
            "mock"
        }

        fn is_observational(&self) -> bool {
            self.observational
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_dry_run() {
        assert_eq!(HandlerKind::Adb.for_dry_run(), HandlerKind::DryRun);
        assert_eq!(HandlerKind::Test.for_dry_run(), HandlerKind::DryRun);
        assert_eq!(HandlerKind::Print.for_dry_run(), HandlerKind::Print);
    }

    #[test]
    fn test_kind_display_matches_cli_names() {
        use clap::ValueEnum;
        for kind in HandlerKind::value_variants() {
            let name = kind.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(kind.to_string(), name);
        }
    }

    #[tokio::test]
    async fn test_create_simulated_and_observers() {
        let graph = Arc::new(GridGraph::build(3).unwrap());
        let mut config = Config::default();
        config.test.path = vec!["1".into(), "2".into(), "3".into(), "6".into()];

        let handler = Handler::create(HandlerKind::Test, &config, &graph).await.unwrap();
        assert_eq!(handler.name(), "test");
        assert!(!handler.is_observational());
        let hit = Pattern::from_labels(&graph, &["1", "2", "3", "6"]).unwrap();
        assert_eq!(handler.attempt(&hit).await.unwrap().outcome, AttemptOutcome::Success);

        for kind in [HandlerKind::Print, HandlerKind::DryRun] {
            let handler = Handler::create(kind, &config, &graph).await.unwrap();
            assert!(handler.is_observational());
        }
    }

    #[tokio::test]
    async fn test_create_simulated_rejects_unknown_nodes() {
        let graph = Arc::new(GridGraph::build(3).unwrap());
        let mut config = Config::default();
        config.test.path = vec!["1".into(), "Z".into()];
        assert!(Handler::create(HandlerKind::Test, &config, &graph).await.is_err());
    }
}
