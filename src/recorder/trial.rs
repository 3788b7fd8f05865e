//! Trial Recorder - one candidate stream scored against the answer

use super::counters::TrialDelta;
use super::{PhaseRecord, TrialCounters};
use crate::storage::{StoreLayout, StreamReplay, StreamWriter};
use crate::template::Assignment;
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Records one candidate assignment per line and scores it on the fly.
///
/// Appends take `&mut self`: a trial stream has exactly one writer. Other
/// trials write to disjoint files and share nothing with this one.
pub struct TrialRecorder {
    trial_id: usize,
    layout: StoreLayout,
    writer: Option<StreamWriter>,
    counters: TrialCounters,
    phase: PhaseRecord,
}

impl TrialRecorder {
    /// Create a recorder for `trial_id` writing into `layout`.
    #[must_use]
    pub fn new(layout: StoreLayout, trial_id: usize) -> Self {
        Self {
            phase: PhaseRecord::new(phase_name(trial_id)),
            trial_id,
            layout,
            writer: None,
            counters: TrialCounters::new(trial_id),
        }
    }

    /// Trial index.
    #[must_use]
    pub const fn trial_id(&self) -> usize {
        self.trial_id
    }

    /// Discard any earlier stream, marker and counters of this trial.
    ///
    /// The new run is bound to the currently finalized answer, if any.
    ///
    /// # Errors
    /// Returns error if the old artifacts cannot be removed or the new
    /// stream cannot be created
    pub fn reset(&mut self) -> Result<()> {
        self.layout.ensure()?;
        let path = self.layout.trial_path(self.trial_id);
        PhaseRecord::clear_marker(&path)?;
        let answer_started_at = PhaseRecord::read_marker(&self.layout.answer_path())?
            .filter(PhaseRecord::is_finalized)
            .and_then(|answer| answer.started_at());

        self.writer = Some(StreamWriter::create(&path)?);
        self.phase = PhaseRecord::new(phase_name(self.trial_id));
        self.phase.start();
        self.phase.bind_answer(answer_started_at);
        self.counters = TrialCounters::new(self.trial_id);
        self.counters.bind(self.phase.started_at());
        debug!(trial = self.trial_id, "trial stream reset");
        Ok(())
    }

    /// Append the candidate assignment of the next line, scored against the
    /// answer at the same position.
    ///
    /// A null `answer` still occupies a slot but is not scored; the trial
    /// must be null there too.
    ///
    /// # Errors
    /// Returns [`Error::TokenizationMismatch`] if both templates are present
    /// with different lengths; nothing is written in that case
    pub fn append(&mut self, trial: Option<&Assignment>, answer: Option<&Assignment>) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::InvalidInput(format!("trial {} appended to before reset", self.trial_id))
        })?;

        let delta = TrialDelta::score(trial, answer, writer.records())?;
        writer.append(trial)?;
        self.counters.apply(delta);
        Ok(())
    }

    /// Flush the stream and write the finalization marker.
    ///
    /// `expected_records` is the answer's record count; a trial of any other
    /// length is not aligned with it and is refused.
    ///
    /// # Errors
    /// Returns [`Error::LengthMismatch`] on a length difference, or an I/O
    /// error if the flush fails
    pub fn finalize(&mut self, expected_records: u64) -> Result<&TrialCounters> {
        let writer = self.writer.take().ok_or_else(|| {
            Error::InvalidInput(format!("trial {} finalized before reset", self.trial_id))
        })?;

        let records = match writer.finish() {
            Ok(records) if records == expected_records => records,
            Ok(records) => {
                let e = Error::LengthMismatch {
                    answer: expected_records,
                    trial: records,
                };
                self.abort(&e);
                return Err(e);
            }
            Err(e) => {
                self.abort(&e);
                return Err(e);
            }
        };
        self.phase.finalize(records);
        self.phase
            .write_marker(&self.layout.trial_path(self.trial_id))?;

        info!(
            trial = self.trial_id,
            records,
            correct_lines = self.counters.correct_lines(),
            clusters = self.counters.number_of_clusters(),
            "trial finalized"
        );
        Ok(&self.counters)
    }

    /// Abandon the current stream after `error` and leave a `Failed` marker
    /// recording why.
    pub fn abort(&mut self, error: &Error) {
        self.writer = None;
        self.phase.fail(error.to_string());
        if let Err(e) = self.phase.write_marker(&self.layout.trial_path(self.trial_id)) {
            warn!(trial = self.trial_id, error = %e, "failed to write trial failure marker");
        }
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn counters(&self) -> &TrialCounters {
        &self.counters
    }

    /// Consume the recorder, keeping its counters.
    #[must_use]
    pub fn into_counters(self) -> TrialCounters {
        self.counters
    }

    /// Lifecycle of the current stream.
    #[must_use]
    pub const fn phase(&self) -> &PhaseRecord {
        &self.phase
    }

    /// Replay this trial's finalized stream.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the trial is not finalized
    pub fn replay(&self) -> Result<StreamReplay> {
        Self::replay_from(&self.layout, self.trial_id)
    }

    /// Replay the finalized stream of `trial_id` in any layout.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the trial is not finalized
    pub fn replay_from(layout: &StoreLayout, trial_id: usize) -> Result<StreamReplay> {
        let path = layout.trial_path(trial_id);
        PhaseRecord::require_finalized(&path)?;
        StreamReplay::open(path)
    }
}

fn phase_name(trial_id: usize) -> String {
    format!("trial{trial_id:02}")
}
