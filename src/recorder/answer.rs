//! Answer Recorder - the ground-truth stream

use super::{AnswerCounters, CounterSnapshot, PhaseRecord};
use crate::storage::{remove_if_exists, StoreLayout, StreamReplay, StreamWriter};
use crate::template::Assignment;
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Records one ground-truth assignment per input line.
///
/// Counters move only after the record has been handed to the stream, so a
/// failed append leaves both unchanged. Nothing can be replayed or scored
/// until [`finalize`](Self::finalize) writes the marker.
pub struct AnswerRecorder {
    layout: StoreLayout,
    writer: Option<StreamWriter>,
    counters: AnswerCounters,
    phase: PhaseRecord,
}

impl AnswerRecorder {
    /// Create a recorder writing into `layout`.
    #[must_use]
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            writer: None,
            counters: AnswerCounters::default(),
            phase: PhaseRecord::new("answer"),
        }
    }

    /// Discard any earlier answer stream, marker and counters and start over.
    ///
    /// The persisted snapshot goes too: its trial counters were scored
    /// against the answer being replaced. Trial streams left on disk stay
    /// bound to the old run and are never scored against the new one.
    ///
    /// # Errors
    /// Returns error if the old artifacts cannot be removed or the new
    /// stream cannot be created
    pub fn reset(&mut self) -> Result<()> {
        self.layout.ensure()?;
        let path = self.layout.answer_path();
        PhaseRecord::clear_marker(&path)?;
        remove_if_exists(&self.layout.snapshot_path())?;

        self.writer = Some(StreamWriter::create(&path)?);
        self.phase = PhaseRecord::new("answer");
        self.phase.start();
        self.counters = AnswerCounters::default();
        self.counters.bind(self.phase.started_at());
        debug!(path = %path.display(), "answer stream reset");
        Ok(())
    }

    /// Append the assignment of the next line.
    ///
    /// # Errors
    /// Returns error if the recorder was not reset, the record cannot be
    /// encoded, or the write fails
    pub fn append(&mut self, assignment: Option<&Assignment>) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::InvalidInput("answer recorder appended to before reset".to_string())
        })?;
        writer.append(assignment)?;
        self.counters.record(assignment);
        Ok(())
    }

    /// Flush the stream and write the finalization marker.
    ///
    /// # Errors
    /// Returns error if the recorder is not running or the flush fails
    pub fn finalize(&mut self) -> Result<&AnswerCounters> {
        let writer = self.writer.take().ok_or_else(|| {
            Error::InvalidInput("answer recorder finalized before reset".to_string())
        })?;

        let records = match writer.finish() {
            Ok(records) => records,
            Err(e) => {
                self.abort(&e);
                return Err(e);
            }
        };
        self.phase.finalize(records);
        self.phase.write_marker(&self.layout.answer_path())?;

        info!(
            records,
            lines = self.counters.lines(),
            clusters = self.counters.number_of_clusters(),
            "answer finalized"
        );
        Ok(&self.counters)
    }

    /// Abandon the current stream after `error` and leave a `Failed` marker
    /// recording why.
    pub fn abort(&mut self, error: &Error) {
        self.writer = None;
        self.phase.fail(error.to_string());
        if let Err(e) = self.phase.write_marker(&self.layout.answer_path()) {
            warn!(error = %e, "failed to write answer failure marker");
        }
        warn!(error = %error, "answer aborted");
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn counters(&self) -> &AnswerCounters {
        &self.counters
    }

    /// Lifecycle of the current stream.
    #[must_use]
    pub const fn phase(&self) -> &PhaseRecord {
        &self.phase
    }

    /// Replay the finalized answer stream from the start.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer is not finalized
    pub fn replay(&self) -> Result<StreamReplay> {
        Self::replay_from(&self.layout)
    }

    /// Replay the finalized answer stream of any layout.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer is not finalized
    pub fn replay_from(layout: &StoreLayout) -> Result<StreamReplay> {
        let path = layout.answer_path();
        PhaseRecord::require_finalized(&path)?;
        StreamReplay::open(path)
    }

    /// Persist the answer counters as a fresh snapshot.
    ///
    /// Trial counters recorded against an earlier answer are dropped with
    /// it.
    ///
    /// # Errors
    /// Returns error if the answer is not finalized or the write fails
    pub fn persist(&self) -> Result<()> {
        if !self.phase.is_finalized() {
            return Err(Error::DataIncomplete(
                "answer must be finalized before its counters are persisted".to_string(),
            ));
        }
        CounterSnapshot::new(self.counters.clone()).persist(&self.layout)
    }

    /// Reload the answer counters persisted in `layout`.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer stream or snapshot is
    /// missing or the snapshot belongs to another answer run
    pub fn reload(layout: &StoreLayout) -> Result<AnswerCounters> {
        let phase = PhaseRecord::require_finalized(&layout.answer_path())?;
        let snapshot = CounterSnapshot::reload(layout)?;
        snapshot.check_answer(&phase)?;
        Ok(snapshot.answer().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(layout: &StoreLayout) -> AnswerRecorder {
        let mut recorder = AnswerRecorder::new(layout.clone());
        recorder.reset().unwrap();
        recorder.append(Some(&Assignment::new(1, ["a", "1"]))).unwrap();
        recorder.append(None).unwrap();
        recorder.append(Some(&Assignment::new(2, ["b", "x"]))).unwrap();
        recorder
    }

    #[test]
    fn test_append_before_reset_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = AnswerRecorder::new(StoreLayout::new(dir.path()));
        assert!(matches!(recorder.append(None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_replay_requires_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let mut recorder = recorded(&layout);
        assert!(matches!(recorder.replay(), Err(Error::DataIncomplete(_))));

        recorder.finalize().unwrap();
        assert_eq!(recorder.replay().unwrap().count(), 3);
    }

    #[test]
    fn test_rejected_append_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let mut recorder = recorded(&layout);
        let before = recorder.counters().clone();

        assert!(recorder.append(Some(&Assignment::new(3, ["@@"]))).is_err());
        assert_eq!(recorder.counters(), &before);
    }

    #[test]
    fn test_reset_is_idempotent_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let mut recorder = recorded(&layout);
        recorder.finalize().unwrap();

        recorder.reset().unwrap();
        recorder.reset().unwrap();
        assert_eq!(recorder.counters().records(), 0);
        assert!(matches!(
            AnswerRecorder::replay_from(&layout),
            Err(Error::DataIncomplete(_))
        ));
    }

    #[test]
    fn test_persist_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let mut recorder = recorded(&layout);
        assert!(recorder.persist().is_err());

        recorder.finalize().unwrap();
        recorder.persist().unwrap();
        assert_eq!(&AnswerRecorder::reload(&layout).unwrap(), recorder.counters());
    }

    #[test]
    fn test_abort_writes_failed_marker() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let mut recorder = recorded(&layout);

        recorder.abort(&Error::Generator("reference crashed".to_string()));
        let marker = PhaseRecord::read_marker(&layout.answer_path()).unwrap().unwrap();
        assert_eq!(marker.status(), crate::recorder::PhaseStatus::Failed);
        assert!(marker.error().unwrap().contains("reference crashed"));
        assert!(matches!(recorder.append(None), Err(Error::InvalidInput(_))));
    }
}
