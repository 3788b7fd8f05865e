//! Metrics engine
//!
//! Computes accuracy and clustering-similarity scores for one trial or as
//! the arithmetic mean over every finalized trial.
//!
//! - Accuracies come straight from the counter snapshot.
//! - Clustering scores replay the answer and trial streams once per trial
//!   into a [`ContingencyTable`].
//!
//! A trial without a `Finalized` marker (aborted, killed, still running) is
//! excluded from means, and asking for it explicitly is
//! [`Error::DataIncomplete`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use ltgen_eval::metrics::{MetricsEngine, TrialSelector};
//! use ltgen_eval::storage::StoreLayout;
//!
//! # fn main() -> ltgen_eval::Result<()> {
//! let engine = MetricsEngine::load(StoreLayout::new("measure_ltgen"))?;
//! println!("line accuracy of trial 0: {}", engine.line_accuracy(TrialSelector::Trial(0))?);
//! println!("{}", engine.report()?);
//! # Ok(())
//! # }
//! ```

pub mod accuracy;
mod contingency;
mod report;

pub use contingency::{ClusteringScores, ContingencyTable, PairCounts};
pub use report::Report;

use crate::recorder::{
    AnswerCounters, AnswerRecorder, CounterSnapshot, PhaseRecord, TrialCounters, TrialRecorder,
};
use crate::storage::StoreLayout;
use crate::{Error, Result};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which trial(s) a metric is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialSelector {
    /// One trial by index
    Trial(usize),
    /// Arithmetic mean over all finalized trials
    Mean,
}

/// Metrics over one evaluation output directory.
pub struct MetricsEngine {
    layout: StoreLayout,
    snapshot: CounterSnapshot,
    finalized: Vec<usize>,
}

impl MetricsEngine {
    /// Load the counter snapshot of `layout` and check which trials are
    /// finalized and aligned with the answer.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer is not finalized or no
    /// snapshot was persisted
    pub fn load(layout: StoreLayout) -> Result<Self> {
        let snapshot = CounterSnapshot::reload(&layout)?;
        Self::from_snapshot(layout, snapshot)
    }

    /// Build from an in-memory snapshot (no reload).
    ///
    /// Only trials whose marker is finalized, aligned with the answer and
    /// bound to the same answer and trial runs as their counters are kept.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer is not finalized or
    /// the snapshot was recorded in another answer run, or
    /// [`Error::LengthMismatch`] if the record counts differ
    pub fn from_snapshot(layout: StoreLayout, snapshot: CounterSnapshot) -> Result<Self> {
        let answer = PhaseRecord::require_finalized(&layout.answer_path())?;
        snapshot.check_answer(&answer)?;

        let mut finalized = Vec::with_capacity(snapshot.trials().len());
        for trial in snapshot.trials() {
            let id = trial.trial_id();
            match PhaseRecord::read_marker(&layout.trial_path(id))? {
                Some(phase) if !phase.is_finalized() => {
                    warn!(trial = id, status = ?phase.status(), "trial not finalized; excluded from metrics");
                }
                Some(phase)
                    if phase.records() == answer.records()
                        && trial.records() == answer.records()
                        && phase.answer_started_at() == answer.started_at()
                        && phase.started_at() == trial.started_at() =>
                {
                    finalized.push(id);
                }
                Some(_) => warn!(trial = id, "trial belongs to another run; excluded from metrics"),
                None => warn!(trial = id, "trial has no marker; excluded from metrics"),
            }
        }
        debug!(trials = finalized.len(), "metrics engine loaded");

        Ok(Self {
            layout,
            snapshot,
            finalized,
        })
    }

    /// Number of finalized trials.
    #[must_use]
    pub fn number_of_trials(&self) -> usize {
        self.finalized.len()
    }

    /// Ids of the finalized trials, ascending.
    #[must_use]
    pub fn trial_ids(&self) -> &[usize] {
        &self.finalized
    }

    /// Answer counters.
    #[must_use]
    pub const fn answer(&self) -> &AnswerCounters {
        self.snapshot.answer()
    }

    /// Message coverage: non-null answer lines.
    #[must_use]
    pub const fn number_of_messages(&self) -> u64 {
        self.snapshot.answer().lines()
    }

    /// Distinct ground-truth clusters.
    #[must_use]
    pub fn number_of_answer_clusters(&self) -> usize {
        self.snapshot.answer().number_of_clusters()
    }

    fn trial(&self, trial_id: usize) -> Result<&TrialCounters> {
        if !self.finalized.contains(&trial_id) {
            return Err(Error::DataIncomplete(format!(
                "trial {trial_id} is not finalized"
            )));
        }
        self.snapshot.trial(trial_id).ok_or_else(|| {
            Error::DataIncomplete(format!("no counters recorded for trial {trial_id}"))
        })
    }

    fn require_trials(&self) -> Result<()> {
        if self.finalized.is_empty() {
            return Err(Error::DataIncomplete("no finalized trials".to_string()));
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn select<F>(&self, selector: TrialSelector, metric: F) -> Result<f64>
    where
        F: Fn(&AnswerCounters, &TrialCounters) -> Result<f64>,
    {
        let answer = self.snapshot.answer();
        match selector {
            TrialSelector::Trial(id) => metric(answer, self.trial(id)?),
            TrialSelector::Mean => {
                self.require_trials()?;
                let mut sum = 0.0;
                for &id in &self.finalized {
                    sum += metric(answer, self.trial(id)?)?;
                }
                Ok(sum / self.finalized.len() as f64)
            }
        }
    }

    /// Number of candidate clusters.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] for a non-finalized selection
    #[allow(clippy::cast_precision_loss)]
    pub fn number_of_trial_clusters(&self, selector: TrialSelector) -> Result<f64> {
        self.select(selector, |_, t| Ok(t.number_of_clusters() as f64))
    }

    /// Word accuracy.
    ///
    /// # Errors
    /// Returns [`Error::EmptyDataset`] with no answer lines, or
    /// [`Error::DataIncomplete`] for a non-finalized selection
    pub fn word_accuracy(&self, selector: TrialSelector) -> Result<f64> {
        self.select(selector, accuracy::word_accuracy)
    }

    /// Line accuracy.
    ///
    /// # Errors
    /// See [`word_accuracy`](Self::word_accuracy)
    pub fn line_accuracy(&self, selector: TrialSelector) -> Result<f64> {
        self.select(selector, accuracy::line_accuracy)
    }

    /// Per-cluster template accuracy (macro-average).
    ///
    /// # Errors
    /// See [`word_accuracy`](Self::word_accuracy)
    pub fn template_accuracy(&self, selector: TrialSelector) -> Result<f64> {
        self.select(selector, accuracy::template_accuracy)
    }

    /// Per-cluster template-word accuracy (macro-average).
    ///
    /// # Errors
    /// See [`word_accuracy`](Self::word_accuracy)
    pub fn template_word_accuracy(&self, selector: TrialSelector) -> Result<f64> {
        self.select(selector, accuracy::template_word_accuracy)
    }

    /// Replay answer and trial streams into a contingency table.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the trial is not finalized, or a
    /// replay error
    pub fn contingency(&self, trial_id: usize) -> Result<ContingencyTable> {
        self.trial(trial_id)?;
        ContingencyTable::from_streams(
            AnswerRecorder::replay_from(&self.layout)?,
            TrialRecorder::replay_from(&self.layout, trial_id)?,
        )
    }

    /// All clustering scores, one replay per trial.
    ///
    /// # Errors
    /// Returns [`Error::EmptyDataset`] with no answer lines, or
    /// [`Error::DataIncomplete`] for a non-finalized selection
    pub fn clustering(&self, selector: TrialSelector) -> Result<ClusteringScores> {
        if self.number_of_messages() == 0 {
            return Err(Error::EmptyDataset(
                "the answer has no non-null lines".to_string(),
            ));
        }
        match selector {
            TrialSelector::Trial(id) => self.contingency(id)?.scores(),
            TrialSelector::Mean => {
                self.require_trials()?;
                let scores = self.per_trial_scores()?;
                ClusteringScores::mean(&scores)
                    .ok_or_else(|| Error::DataIncomplete("no finalized trials".to_string()))
            }
        }
    }

    #[cfg(feature = "parallel")]
    fn per_trial_scores(&self) -> Result<Vec<ClusteringScores>> {
        self.finalized
            .par_iter()
            .map(|&id| self.contingency(id)?.scores())
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn per_trial_scores(&self) -> Result<Vec<ClusteringScores>> {
        self.finalized
            .iter()
            .map(|&id| self.contingency(id)?.scores())
            .collect()
    }

    /// Rand Index.
    ///
    /// # Errors
    /// See [`clustering`](Self::clustering)
    pub fn rand_score(&self, selector: TrialSelector) -> Result<f64> {
        Ok(self.clustering(selector)?.rand_index)
    }

    /// Adjusted Rand Index.
    ///
    /// # Errors
    /// See [`clustering`](Self::clustering)
    pub fn adjusted_rand_score(&self, selector: TrialSelector) -> Result<f64> {
        Ok(self.clustering(selector)?.adjusted_rand_index)
    }

    /// Pairwise F1.
    ///
    /// # Errors
    /// See [`clustering`](Self::clustering)
    pub fn f1_score(&self, selector: TrialSelector) -> Result<f64> {
        Ok(self.clustering(selector)?.f1)
    }

    /// Parsing accuracy.
    ///
    /// # Errors
    /// See [`clustering`](Self::clustering)
    pub fn parsing_accuracy(&self, selector: TrialSelector) -> Result<f64> {
        Ok(self.clustering(selector)?.parsing_accuracy)
    }

    /// Every metric averaged over finalized trials.
    ///
    /// With zero non-null answer lines, every ratio reads "no data".
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if no trial finalized, or a replay
    /// error
    pub fn report(&self) -> Result<Report> {
        self.require_trials()?;
        let mean = TrialSelector::Mean;

        let mut report = Report {
            n_trials: self.number_of_trials(),
            n_messages: self.number_of_messages(),
            n_answer_clusters: self.number_of_answer_clusters(),
            n_trial_clusters: Some(self.number_of_trial_clusters(mean)?),
            word_accuracy: None,
            line_accuracy: None,
            template_accuracy: None,
            template_word_accuracy: None,
            rand_index: None,
            adjusted_rand_index: None,
            f1: None,
            parsing_accuracy: None,
        };
        if report.n_messages == 0 {
            return Ok(report);
        }

        report.word_accuracy = no_data(self.word_accuracy(mean))?;
        report.line_accuracy = no_data(self.line_accuracy(mean))?;
        report.template_accuracy = no_data(self.template_accuracy(mean))?;
        report.template_word_accuracy = no_data(self.template_word_accuracy(mean))?;

        let clustering = self.clustering(mean)?;
        report.rand_index = Some(clustering.rand_index);
        report.adjusted_rand_index = Some(clustering.adjusted_rand_index);
        report.f1 = Some(clustering.f1);
        report.parsing_accuracy = Some(clustering.parsing_accuracy);
        Ok(report)
    }
}

/// Turn "nothing to measure" into `None`, keep real failures.
fn no_data(result: Result<f64>) -> Result<Option<f64>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(Error::EmptyDataset(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
