//! AdbHandler - real device attempts through TWRP's `decrypt` command

use std::io;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{AttemptHandler, AttemptReport, HandlerError};
use crate::config::Config;
use crate::pattern::Pattern;

/// Everything the ADB handler needs from the configuration
#[derive(Debug, Clone)]
pub struct AdbSettings {
    /// Path or name of the adb binary
    pub binary: String,

    /// Announce each attempt on the device console before decrypting
    pub echo_commands: bool,

    /// Per-invocation timeout
    pub timeout: Duration,

    /// Output substring meaning the pattern unlocked the device
    pub success: String,

    /// Output substring meaning the pattern was rejected
    pub failure: String,

    /// Output substring meaning the device could not process the attempt
    pub error: String,
}

impl AdbSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.adb.binary.clone(),
            echo_commands: config.adb.echo_commands,
            timeout: Duration::from_millis(config.attempt.timeout_ms),
            success: config.output.success.clone(),
            failure: config.output.failure.clone(),
            error: config.output.error.clone(),
        }
    }
}

/// Sends patterns to a device in TWRP recovery
pub struct AdbHandler {
    settings: AdbSettings,
}

impl AdbHandler {
    /// Start the ADB server and return a ready handler
    ///
    /// Any failure here is fatal: without a server there is nothing to attempt.
    pub async fn start(settings: AdbSettings) -> Result<Self, HandlerError> {
        debug!(binary = %settings.binary, "AdbHandler::start: called");
        let output = run(&settings.binary, &["start-server"], settings.timeout)
            .await
            .map_err(|e| HandlerError::Fatal(e.to_string()))?;
        if !output.status.success() {
            return Err(HandlerError::Fatal(format!(
                "'{} start-server' exited with {}: {}",
                settings.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        info!(binary = %settings.binary, "AdbHandler::start: adb server running");
        Ok(Self { settings })
    }

    /// Remote command for one attempt
    ///
    /// The device shell sees the key single-quoted since grid labels include
    /// shell metacharacters such as `;` and `<`.
    fn shell_command(&self, key: &str) -> String {
        let decrypt = format!("twrp decrypt '{}'", key);
        if self.settings.echo_commands {
            format!("echo '[GAPBF] Attempting: {}' && {}", key, decrypt)
        } else {
            decrypt
        }
    }

    /// Classify the device's response to one attempt
    ///
    /// The success and failure literals are matched against stdout only;
    /// stderr noise from `adb shell` does not change the verdict.
    fn classify(&self, output: &Output) -> Result<AttemptReport, HandlerError> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = one_line(&stdout, &stderr);
        let code = output.status.code();
        debug!(?code, %detail, "AdbHandler::classify: called");

        let in_stdout = |literal: &str| !literal.is_empty() && stdout.contains(literal);
        let error = self.settings.error.as_str();

        if in_stdout(error) || (!error.is_empty() && stderr.contains(error)) {
            return Err(HandlerError::Transient(format!("device reported an error: {}", detail)));
        }
        if code == Some(0) {
            if in_stdout(&self.settings.success) {
                return Ok(AttemptReport::success().with_detail(detail));
            }
            if in_stdout(&self.settings.failure) {
                return Ok(AttemptReport::failure().with_detail(detail));
            }
        }

        let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        Ok(AttemptReport::unknown(format!("exit {}: {}", status, detail)))
    }
}

#[async_trait]
impl AttemptHandler for AdbHandler {
    async fn attempt(&self, pattern: &Pattern) -> Result<AttemptReport, HandlerError> {
        debug!(key = %pattern.key(), "AdbHandler::attempt: called");
        let command = self.shell_command(pattern.key());
        let args = ["shell", command.as_str()];

        let output = match run(&self.settings.binary, &args, self.settings.timeout).await {
            Ok(output) => output,
            Err(RunError::NotFound(binary)) => {
                return Err(HandlerError::Fatal(format!("adb binary '{}' not found", binary)));
            }
            Err(e) => {
                warn!(error = %e, "AdbHandler::attempt: invocation failed");
                return Err(HandlerError::Transient(e.to_string()));
            }
        };
        self.classify(&output)
    }

    fn name(&self) -> &'static str {
        "adb"
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("'{0}' not found")]
    NotFound(String),

    #[error("Failed to run '{binary}': {source}")]
    Io {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("'{0}' timed out after {1:?}")]
    Timeout(String, Duration),
}

async fn run(binary: &str, args: &[&str], timeout: Duration) -> Result<Output, RunError> {
    debug!(%binary, ?args, timeout_ms = timeout.as_millis() as u64, "run: called");
    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(binary).args(args).kill_on_drop(true).output(),
    )
    .await;

    match output {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => Err(RunError::NotFound(binary.to_string())),
        Ok(Err(source)) => Err(RunError::Io {
            binary: binary.to_string(),
            source,
        }),
        Err(_) => {
            debug!(%binary, "run: command timed out");
            Err(RunError::Timeout(binary.to_string(), timeout))
        }
    }
}

/// Collapse stdout and stderr into a single log-friendly line
fn one_line(stdout: &str, stderr: &str) -> String {
    let mut text = stdout.trim().replace('\n', "\\n");
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        text.push_str(" | stderr: ");
        text.push_str(&stderr.replace('\n', "\\n"));
    }
    text
}
