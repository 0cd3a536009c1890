//! Attempt records and their line encoding

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Timestamp layout of persisted records (fixed width, sorts lexically, always UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Terminal result of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// The pattern unlocked the target
    Success,
    /// The target rejected the pattern
    Failure,
    /// The attempt errored or was interrupted; the result is not known
    Unknown,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
            AttemptOutcome::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptOutcome {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AttemptOutcome::Success),
            "failure" => Ok(AttemptOutcome::Failure),
            "unknown" => Ok(AttemptOutcome::Unknown),
            other => Err(ParseError::UnknownOutcome(other.to_string())),
        }
    }
}

/// One attempted pattern, as persisted in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Canonical pattern key (node labels concatenated)
    pub key: String,
    pub outcome: AttemptOutcome,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(key: impl Into<String>, outcome: AttemptOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            outcome,
            timestamp,
        }
    }

    /// Encode as a ledger line (without the trailing newline)
    pub fn to_line(&self) -> String {
        format!("{},{},{}", self.key, self.outcome, format_timestamp(&self.timestamp))
    }

    /// Decode a ledger line
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches('\r');
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(ParseError::FieldCount(fields.len()));
        }

        let key = fields[0].trim();
        if key.is_empty() {
            return Err(ParseError::EmptyKey);
        }

        let outcome = fields[1].trim().parse()?;
        let timestamp = parse_timestamp(fields[2].trim())?;

        Ok(Self {
            key: key.to_string(),
            outcome,
            timestamp,
        })
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ParseError::Timestamp(format!("{}: {}", s, e)))
}
