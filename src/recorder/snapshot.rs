//! Counter Snapshot - persisted aggregates of the answer and every trial
//!
//! The per-line streams are already durable; only counters need saving so
//! metrics can be computed in another process without re-recording.

use super::{AnswerCounters, PhaseRecord, TrialCounters};
use crate::storage::StoreLayout;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Answer counters plus the counters of every successful trial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    answer: AnswerCounters,
    trials: Vec<TrialCounters>,
}

impl CounterSnapshot {
    /// Create a snapshot with no trials yet.
    #[must_use]
    pub fn new(answer: AnswerCounters) -> Self {
        Self {
            answer,
            trials: Vec::new(),
        }
    }

    /// Get the answer counters.
    #[must_use]
    pub const fn answer(&self) -> &AnswerCounters {
        &self.answer
    }

    /// Get all trial counters, ordered by trial id.
    #[must_use]
    pub fn trials(&self) -> &[TrialCounters] {
        &self.trials
    }

    /// Get the counters of one trial.
    #[must_use]
    pub fn trial(&self, trial_id: usize) -> Option<&TrialCounters> {
        self.trials
            .binary_search_by_key(&trial_id, TrialCounters::trial_id)
            .ok()
            .map(|idx| &self.trials[idx])
    }

    /// Add (or replace) the counters of one trial.
    pub fn add_trial(&mut self, counters: TrialCounters) {
        match self
            .trials
            .binary_search_by_key(&counters.trial_id(), TrialCounters::trial_id)
        {
            Ok(idx) => self.trials[idx] = counters,
            Err(idx) => self.trials.insert(idx, counters),
        }
    }

    /// Drop the counters of one trial, returning them if present.
    pub fn remove_trial(&mut self, trial_id: usize) -> Option<TrialCounters> {
        self.trials
            .binary_search_by_key(&trial_id, TrialCounters::trial_id)
            .ok()
            .map(|idx| self.trials.remove(idx))
    }

    /// Require these counters to belong to the finalized `answer` phase.
    ///
    /// # Errors
    /// Returns [`Error::LengthMismatch`] if the record counts differ, or
    /// [`Error::DataIncomplete`] if the counters were recorded in another
    /// answer run
    pub fn check_answer(&self, answer: &PhaseRecord) -> Result<()> {
        if answer.records() != self.answer.records() {
            return Err(Error::LengthMismatch {
                answer: answer.records(),
                trial: self.answer.records(),
            });
        }
        if answer.started_at() != self.answer.started_at() {
            return Err(Error::DataIncomplete(
                "counter snapshot belongs to an earlier answer run".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the snapshot to `info.json` in the layout.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn persist(&self, layout: &StoreLayout) -> Result<()> {
        layout.ensure()?;
        let path = layout.snapshot_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(self)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Read the snapshot back from `info.json`.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if no snapshot was ever persisted,
    /// or an I/O / parse error otherwise
    pub fn reload(layout: &StoreLayout) -> Result<Self> {
        let path = layout.snapshot_path();
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::DataIncomplete(format!("no counter snapshot at {}", path.display()))
            } else {
                Error::StorageIo(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
