//! AttemptLedger - durable, resumable record of attempted patterns

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::record::{AttemptOutcome, AttemptRecord};

/// What happened while replaying a ledger file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Well-formed records restored
    pub loaded: usize,
    /// Lines that could not be parsed and were skipped
    pub malformed: usize,
    /// Well-formed records whose key was already present (first one wins)
    pub duplicates: usize,
}

/// Per-outcome totals over a ledger
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub unknown: usize,
    /// Most recent record by timestamp
    pub last: Option<AttemptRecord>,
    /// Earliest successful record, if any
    pub winning: Option<AttemptRecord>,
}

/// Append-only ledger of attempted patterns
///
/// The in-memory map is the dedup index; the backing file (when there is one)
/// is the source of truth across restarts. A record is appended and synced
/// before it becomes visible through [`AttemptLedger::has`].
pub struct AttemptLedger {
    /// Backing file path, `None` for memory-only ledgers
    path: Option<PathBuf>,

    /// Append handle, `None` for memory-only and snapshot ledgers
    writer: Option<File>,

    /// Records by canonical pattern key
    records: HashMap<String, AttemptRecord>,

    /// Stats from the initial replay
    load_stats: LoadStats,
}

impl AttemptLedger {
    /// A ledger with no backing store
    pub fn in_memory() -> Self {
        debug!("AttemptLedger::in_memory: called");
        Self {
            path: None,
            writer: None,
            records: HashMap::new(),
            load_stats: LoadStats::default(),
        }
    }

    /// Open (or create) a ledger file and replay every well-formed record
    ///
    /// Malformed lines are skipped with a warning; partial corruption never
    /// blocks a resume.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "AttemptLedger::load: called");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
        }

        let mut writer = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| LedgerError::io(&path, e))?;

        terminate_torn_tail(&mut writer).map_err(|e| LedgerError::io(&path, e))?;

        let (records, load_stats) = read_records(&path)?;
        let mut ledger = Self {
            path: Some(path.clone()),
            writer: Some(writer),
            records: HashMap::new(),
            load_stats,
        };
        ledger.restore(records);

        info!(
            ?path,
            loaded = ledger.load_stats.loaded,
            malformed = ledger.load_stats.malformed,
            duplicates = ledger.load_stats.duplicates,
            "Ledger loaded"
        );
        Ok(ledger)
    }

    /// Read-only copy of a ledger file: new records stay in memory
    ///
    /// A missing file yields an empty snapshot.
    pub fn snapshot(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        debug!(?path, "AttemptLedger::snapshot: called");
        let mut ledger = Self::in_memory();
        if path.exists() {
            let (records, load_stats) = read_records(path)?;
            ledger.load_stats = load_stats;
            ledger.restore(records);
        } else {
            debug!(?path, "AttemptLedger::snapshot: no ledger file, starting empty");
        }
        Ok(ledger)
    }

    fn restore(&mut self, records: Vec<AttemptRecord>) {
        for record in records {
            if self.records.contains_key(&record.key) {
                self.load_stats.duplicates += 1;
                continue;
            }
            self.records.insert(record.key.clone(), record);
        }
        self.load_stats.loaded = self.records.len();
    }

    /// Whether a pattern has a terminal record
    pub fn has(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&AttemptRecord> {
        self.records.get(key)
    }

    /// Append a record durably
    ///
    /// Returns `Ok(false)` without touching the store when the key already
    /// has a record: a pattern never gets a second terminal record.
    pub fn record(&mut self, key: &str, outcome: AttemptOutcome, timestamp: DateTime<Utc>) -> Result<bool, LedgerError> {
        debug!(%key, %outcome, "AttemptLedger::record: called");
        if self.records.contains_key(key) {
            debug!(%key, "AttemptLedger::record: already recorded, skipping");
            return Ok(false);
        }
        if key.is_empty() || key.contains(',') || key.chars().any(char::is_whitespace) {
            return Err(LedgerError::InvalidKey(key.to_string()));
        }

        let record = AttemptRecord::new(key, outcome, timestamp);
        if let Some(writer) = self.writer.as_mut() {
            let mut line = record.to_line();
            line.push('\n');
            append_locked(writer, line.as_bytes()).map_err(|e| LedgerError::io(self.display_path(), e))?;
        }

        self.records.insert(record.key.clone(), record);
        Ok(true)
    }

    /// Make every record appended so far durable
    pub fn flush(&mut self) -> Result<(), LedgerError> {
        debug!(persistent = self.is_persistent(), "AttemptLedger::flush: called");
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .and_then(|_| writer.sync_all())
                .map_err(|e| LedgerError::io(self.display_path(), e))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether appends reach a backing file
    pub fn is_persistent(&self) -> bool {
        self.writer.is_some()
    }

    pub fn load_stats(&self) -> LoadStats {
        self.load_stats
    }

    pub fn records(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.records.values()
    }

    pub fn summary(&self) -> LedgerSummary {
        summarize(self.records.values())
    }

    fn display_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("<memory>"))
    }
}

impl Drop for AttemptLedger {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writer.sync_all()
        {
            warn!(error = %e, "AttemptLedger: final sync failed");
        }
    }
}

/// Read every well-formed record from a ledger file, in file order
///
/// Holds a shared lock for the duration of one read pass, so it never
/// observes a half-written append.
pub fn read_records(path: impl AsRef<Path>) -> Result<(Vec<AttemptRecord>, LoadStats), LedgerError> {
    let path = path.as_ref();
    debug!(?path, "read_records: called");

    let mut file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
    let mut bytes = Vec::new();
    FileExt::lock_shared(&file).map_err(|e| LedgerError::io(path, e))?;
    let read = file.read_to_end(&mut bytes);
    FileExt::unlock(&file).map_err(|e| LedgerError::io(path, e))?;
    read.map_err(|e| LedgerError::io(path, e))?;

    let mut records = Vec::new();
    let mut stats = LoadStats::default();
    for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let parsed = std::str::from_utf8(raw)
            .map_err(|_| crate::error::ParseError::Encoding)
            .and_then(AttemptRecord::parse_line);
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                stats.malformed += 1;
                warn!(?path, line = index + 1, error = %e, "read_records: skipping malformed record");
            }
        }
    }

    stats.loaded = records.len();
    debug!(?path, loaded = stats.loaded, malformed = stats.malformed, "read_records: done");
    Ok((records, stats))
}

fn summarize<'a>(records: impl Iterator<Item = &'a AttemptRecord>) -> LedgerSummary {
    let mut summary = LedgerSummary::default();
    for record in records {
        summary.total += 1;
        match record.outcome {
            AttemptOutcome::Success => {
                summary.success += 1;
                let earlier = summary
                    .winning
                    .as_ref()
                    .map(|winning| record.timestamp < winning.timestamp)
                    .unwrap_or(true);
                if earlier {
                    summary.winning = Some(record.clone());
                }
            }
            AttemptOutcome::Failure => summary.failure += 1,
            AttemptOutcome::Unknown => summary.unknown += 1,
        }
        let newer = summary
            .last
            .as_ref()
            .map(|last| record.timestamp > last.timestamp)
            .unwrap_or(true);
        if newer {
            summary.last = Some(record.clone());
        }
    }
    summary
}

/// Single append under an exclusive lock, synced before the lock is released
fn append_locked(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    FileExt::lock_exclusive(&*file)?;
    let result = file.write_all(bytes).and_then(|_| file.sync_data());
    FileExt::unlock(&*file)?;
    result
}

/// A crash mid-append can leave a final line without its newline; terminate
/// it so the next record starts on a line of its own.
fn terminate_torn_tail(file: &mut File) -> std::io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    FileExt::lock_exclusive(&*file)?;
    let result = terminate_last_line(file);
    FileExt::unlock(&*file)?;
    result
}

fn terminate_last_line(file: &mut File) -> std::io::Result<()> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        warn!("Ledger ends with a partial record, terminating it");
        file.write_all(b"\n")?;
        file.sync_data()?;
    }
    Ok(())
}
