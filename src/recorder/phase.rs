//! Phase Record - lifecycle and finalization marker of one recorded stream

use crate::storage::{remove_if_exists, StoreLayout};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Status of a recording phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    /// Phase is created but nothing has been written.
    Pending,
    /// Records are being appended.
    Running,
    /// Stream is complete and flushed; safe to replay and score.
    Finalized,
    /// Phase aborted; its stream is partial and never replayed.
    Failed,
}

/// Phase Record tracks one answer or trial stream from reset to finalize.
///
/// Serialized as the `<stream>.done` marker once the phase finalizes or
/// aborts. A stream without a `Finalized` marker is a truncated run and is
/// never replayed or scored; a `Failed` marker also records why.
///
/// A trial marker carries the `started_at` of the answer run it was scored
/// against, so a trial left over from an earlier answer is recognizable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseRecord {
    phase: String,
    status: PhaseStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    records: u64,
    #[serde(default)]
    answer_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    error: Option<String>,
}

impl PhaseRecord {
    /// Create a new phase record in Pending status.
    #[must_use]
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            status: PhaseStatus::Pending,
            started_at: None,
            ended_at: None,
            records: 0,
            answer_started_at: None,
            error: None,
        }
    }

    /// Get the phase name (`answer`, `trial00`, ...).
    #[must_use]
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> PhaseStatus {
        self.status
    }

    /// Whether the phase completed.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status == PhaseStatus::Finalized
    }

    /// Get the start timestamp, if started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if ended.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Number of records in the finalized stream.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Start of the answer run this phase was scored against.
    #[must_use]
    pub const fn answer_started_at(&self) -> Option<DateTime<Utc>> {
        self.answer_started_at
    }

    /// Why the phase aborted, if it did.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Transition from Pending to Running.
    pub fn start(&mut self) {
        self.status = PhaseStatus::Running;
        self.started_at = Some(Utc::now());
        self.ended_at = None;
        self.records = 0;
        self.error = None;
    }

    /// Bind this phase to the answer run started at `answer_started_at`.
    pub fn bind_answer(&mut self, answer_started_at: Option<DateTime<Utc>>) {
        self.answer_started_at = answer_started_at;
    }

    /// Mark the phase complete with its final record count.
    pub fn finalize(&mut self, records: u64) {
        self.status = PhaseStatus::Finalized;
        self.records = records;
        self.ended_at = Some(Utc::now());
    }

    /// Mark the phase aborted because of `reason`.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = PhaseStatus::Failed;
        self.error = Some(reason.into());
        self.ended_at = Some(Utc::now());
    }

    /// Write this record as the marker of `stream`.
    ///
    /// Written to a temporary file first and renamed into place, so a
    /// reader sees either no marker or a complete one.
    ///
    /// # Errors
    /// Returns error if the marker cannot be serialized or written
    pub fn write_marker(&self, stream: &Path) -> Result<()> {
        let marker = StoreLayout::marker_path(stream);
        let tmp = marker.with_extension("done.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, &marker)?;
        Ok(())
    }

    /// Remove the marker of `stream`, if any.
    ///
    /// # Errors
    /// Returns error if an existing marker cannot be removed
    pub fn clear_marker(stream: &Path) -> Result<()> {
        remove_if_exists(&StoreLayout::marker_path(stream))
    }

    /// Read the marker of `stream`; `None` if there is none.
    ///
    /// # Errors
    /// Returns error if the marker exists but cannot be read or parsed
    pub fn read_marker(stream: &Path) -> Result<Option<Self>> {
        match fs::read(StoreLayout::marker_path(stream)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the marker of `stream` and require it to be `Finalized`.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the marker is missing or the
    /// phase did not finalize
    pub fn require_finalized(stream: &Path) -> Result<Self> {
        match Self::read_marker(stream)? {
            Some(record) if record.is_finalized() => Ok(record),
            Some(record) => Err(Error::DataIncomplete(format!(
                "{} ended in status {:?}{}",
                record.phase,
                record.status,
                record.error.map(|e| format!(" ({e})")).unwrap_or_default()
            ))),
            None => Err(Error::DataIncomplete(format!(
                "no finalization marker for {}",
                stream.display()
            ))),
        }
    }
}
