//! gapbf configuration types and loading

use eyre::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constraints::ConstraintSet;
use crate::grid::{GridError, GridGraph};
use crate::handler::HandlerKind;
use crate::pattern::Pattern;

/// Main gapbf configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grid layout
    pub grid: GridConfig,

    /// Pattern constraints
    pub path: PathConfig,

    /// Attempt cadence and retry policy
    pub attempt: AttemptConfig,

    /// ADB invocation
    pub adb: AdbConfig,

    /// Device output classification
    pub output: OutputConfig,

    /// Attempt ledger locations
    pub ledger: LedgerConfig,

    /// Simulated device
    pub test: TestConfig,

    /// Known search-space size; 0 means count it
    #[serde(rename = "total-paths")]
    pub total_paths: u64,

    /// Progress reporting
    pub progress: ProgressConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// `mode` is the handler about to run, if any: device mode needs the
    /// classification literals and test mode needs a secret pattern.
    pub fn validate(&self, mode: Option<HandlerKind>) -> Result<()> {
        debug!(?mode, "Config::validate: called");
        if !(3..=6).contains(&self.grid.size) {
            bail!("grid.size must be 3, 4, 5 or 6, got {}", self.grid.size);
        }
        if self.path.min_length < 1 {
            bail!("path.min-length must be at least 1");
        }
        if self.path.max_length != 0 && self.path.min_length > self.path.max_length {
            bail!(
                "path.min-length ({}) cannot exceed path.max-length ({})",
                self.path.min_length,
                self.path.max_length
            );
        }
        if self.attempt.timeout_ms == 0 {
            bail!("attempt.timeout-ms must be greater than 0");
        }

        match mode {
            Some(HandlerKind::Adb) => {
                if self.output.success.is_empty() || self.output.failure.is_empty() {
                    bail!("output.success and output.failure must be set to talk to a device");
                }
            }
            Some(HandlerKind::Test) => {
                if self.test.path.is_empty() {
                    bail!("test.path must be set for test mode");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./gapbf.yml
        let local_config = PathBuf::from("gapbf.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/gapbf/gapbf.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("gapbf").join("gapbf.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Log level from the config file, read before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Build the configured grid
    pub fn graph(&self) -> Result<GridGraph, GridError> {
        GridGraph::build(self.grid.size)
    }

    /// Constraint set for `graph`; a zero max length means every node
    pub fn constraints(&self, graph: &GridGraph) -> ConstraintSet {
        let max_length = match self.path.max_length {
            0 => graph.node_count(),
            n => n,
        };
        ConstraintSet::new(self.path.min_length, max_length)
            .with_prefix(self.path.prefix.iter().cloned())
            .with_suffix(self.path.suffix.iter().cloned())
            .with_excluded(self.path.excluded.iter().cloned())
    }

    /// The simulated device's secret
    pub fn test_pattern(&self, graph: &GridGraph) -> Result<Pattern, GridError> {
        Pattern::from_labels(graph, &self.test.path)
    }

    /// Ledger file for a handler: simulated runs keep their own
    pub fn ledger_path(&self, mode: HandlerKind) -> &Path {
        match mode {
            HandlerKind::Test => &self.ledger.simulation_path,
            _ => &self.ledger.path,
        }
    }

    /// Configured search-space size, if set
    pub fn known_total(&self) -> Option<u64> {
        (self.total_paths > 0).then_some(self.total_paths)
    }
}

/// Grid layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length (3 to 6)
    pub size: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { size: 3 }
    }
}

/// Pattern constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Shortest pattern to try
    #[serde(rename = "min-length")]
    pub min_length: usize,

    /// Longest pattern to try; 0 means the node count
    #[serde(rename = "max-length")]
    pub max_length: usize,

    /// Nodes every pattern starts with
    #[serde(deserialize_with = "node_labels")]
    pub prefix: Vec<String>,

    /// Nodes every pattern ends with
    #[serde(deserialize_with = "node_labels")]
    pub suffix: Vec<String>,

    /// Nodes never used
    #[serde(deserialize_with = "node_labels")]
    pub excluded: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 0,
            prefix: Vec::new(),
            suffix: Vec::new(),
            excluded: Vec::new(),
        }
    }
}

/// Attempt cadence and retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptConfig {
    /// Minimum delay between device attempts in milliseconds
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Retries after a transient handler failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First retry backoff in milliseconds, doubled per retry
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Per-invocation timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            max_retries: 3,
            initial_backoff_ms: 1000,
            timeout_ms: 30_000,
        }
    }
}

/// ADB invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdbConfig {
    /// adb binary name or path
    pub binary: String,

    /// Echo each attempt on the device console before decrypting
    #[serde(rename = "echo-commands")]
    pub echo_commands: bool,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            binary: "adb".to_string(),
            echo_commands: true,
        }
    }
}

/// Substrings of device output that classify an attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub success: String,
    pub failure: String,
    pub error: String,
}

/// Attempt ledger locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger for device runs
    pub path: PathBuf,

    /// Ledger for simulated runs
    #[serde(rename = "simulation-path")]
    pub simulation_path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./paths_log.csv"),
            simulation_path: PathBuf::from("./test_paths_log.csv"),
        }
    }
}

/// Simulated device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// The pattern the simulated device accepts
    #[serde(deserialize_with = "node_labels")]
    pub path: Vec<String>,
}

/// Progress reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Reporter interval in milliseconds; 0 disables it
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

/// Node lists accept YAML integers as well as strings: `[1, 2, ":"]`
fn node_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Number(u64),
        Text(String),
    }

    let labels = Option::<Vec<Label>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(labels
        .into_iter()
        .map(|label| match label {
            Label::Number(n) => n.to_string(),
            Label::Text(s) => s,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.grid.size, 3);
        assert_eq!(config.path.min_length, 4);
        assert_eq!(config.path.max_length, 0);
        assert_eq!(config.attempt.max_retries, 3);
        assert_eq!(config.attempt.timeout_ms, 30_000);
        assert_eq!(config.adb.binary, "adb");
        assert!(config.adb.echo_commands);
        assert_eq!(config.ledger.path, PathBuf::from("./paths_log.csv"));
        assert_eq!(config.progress.interval_ms, 2000);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
grid:
  size: 4

path:
  min-length: 5
  max-length: 8
  prefix: [1, 2]
  suffix: [":", 9]
  excluded: ["@"]

attempt:
  delay-ms: 30000
  timeout-ms: 45000

adb:
  binary: /opt/platform-tools/adb
  echo-commands: false

output:
  success: "Data successfully decrypted"
  failure: "Failed to decrypt data"
  error: "error:"

ledger:
  path: /var/lib/gapbf/paths.csv

test:
  path: [1, 2, 3, 7]

total-paths: 12345
log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.grid.size, 4);
        assert_eq!(config.path.min_length, 5);
        assert_eq!(config.path.prefix, vec!["1", "2"]);
        assert_eq!(config.path.suffix, vec![":", "9"]);
        assert_eq!(config.path.excluded, vec!["@"]);
        assert_eq!(config.attempt.delay_ms, 30_000);
        assert_eq!(config.attempt.max_retries, 3);
        assert_eq!(config.adb.binary, "/opt/platform-tools/adb");
        assert!(!config.adb.echo_commands);
        assert_eq!(config.output.failure, "Failed to decrypt data");
        assert_eq!(config.ledger.path, PathBuf::from("/var/lib/gapbf/paths.csv"));
        assert_eq!(config.ledger.simulation_path, PathBuf::from("./test_paths_log.csv"));
        assert_eq!(config.test.path, vec!["1", "2", "3", "7"]);
        assert_eq!(config.known_total(), Some(12345));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
path:
  prefix: [5]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.path.prefix, vec!["5"]);
        assert_eq!(config.path.min_length, 4);
        assert_eq!(config.grid.size, 3);
        assert_eq!(config.known_total(), None);
    }

    #[test]
    fn test_null_node_list() {
        let config: Config = serde_yaml::from_str("path:\n  excluded:\n").unwrap();
        assert!(config.path.excluded.is_empty());
    }

    #[test]
    fn test_validate() {
        let config = Config::default();
        assert!(config.validate(None).is_ok());
        assert!(config.validate(Some(HandlerKind::Print)).is_ok());
        // Device mode needs classification literals
        assert!(config.validate(Some(HandlerKind::Adb)).is_err());
        // Test mode needs a secret
        assert!(config.validate(Some(HandlerKind::Test)).is_err());

        let mut config = Config::default();
        config.grid.size = 7;
        assert!(config.validate(None).is_err());

        let mut config = Config::default();
        config.path.min_length = 6;
        config.path.max_length = 5;
        assert!(config.validate(None).is_err());

        let mut config = Config::default();
        config.output.success = "Data successfully decrypted".to_string();
        config.output.failure = "Failed to decrypt data".to_string();
        assert!(config.validate(Some(HandlerKind::Adb)).is_ok());
    }

    #[test]
    fn test_constraints_default_max_is_node_count() {
        let config = Config::default();
        let graph = config.graph().unwrap();
        let constraints = config.constraints(&graph);
        assert_eq!(constraints.min_length, 4);
        assert_eq!(constraints.max_length, 9);
    }

    #[test]
    fn test_ledger_path_per_mode() {
        let config = Config::default();
        assert_eq!(config.ledger_path(HandlerKind::Adb), Path::new("./paths_log.csv"));
        assert_eq!(config.ledger_path(HandlerKind::Test), Path::new("./test_paths_log.csv"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gapbf.yml");
        fs::write(&path, "grid:\n  size: 5\nlog-level: warn\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.grid.size, 5);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }
}
