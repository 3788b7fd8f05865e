//! Comparison driver
//!
//! Orchestrates one evaluation run:
//!
//! ```text
//! Init -> BuildingAnswer -> Trials -> Reporting -> Done
//! ```
//!
//! 1. The reference generator templates every input line into the answer.
//! 2. `n_trials` fresh candidates each template the same input again; each
//!    trial owns its recorder and generator and runs on the worker pool.
//! 3. The counter snapshot (answer + successful trials) is persisted and the
//!    report is computed from it.
//!
//! A failed trial is logged and excluded; it never aborts its siblings or the
//! answer. Its marker records `Failed` and the reason.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ltgen_eval::config::EvalConfig;
//! use ltgen_eval::driver::{ComparisonDriver, FileLineSource, TemplateGenerator, TemplateTable};
//! use ltgen_eval::template::ClusterId;
//!
//! struct Whitespace(TemplateTable);
//!
//! impl TemplateGenerator for Whitespace {
//!     fn generate_tpl(&mut self, line: &str) -> ltgen_eval::Result<Option<Vec<String>>> {
//!         Ok(Some(line.split_whitespace().map(String::from).collect()))
//!     }
//!     fn match_table(&mut self, tokens: &[String]) -> ltgen_eval::Result<(ClusterId, bool)> {
//!         Ok(self.0.match_or_insert(tokens))
//!     }
//! }
//!
//! # fn main() -> ltgen_eval::Result<()> {
//! let config = EvalConfig::builder().n_trials(3).build()?;
//! let mut driver = ComparisonDriver::new(config, FileLineSource::new(["auth.log"]));
//! let report = driver.run(Whitespace(TemplateTable::new()), |_| {
//!     Ok(Whitespace(TemplateTable::new()))
//! })?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

mod generator;
mod source;
mod timing;

pub use generator::{TemplateGenerator, TemplateTable};
pub use source::{FileLineSource, LineIter, LineSource, MemoryLineSource};
pub use timing::{measure_time, TimingReport};

use crate::config::EvalConfig;
use crate::metrics::{MetricsEngine, Report};
use crate::recorder::{
    AnswerCounters, AnswerRecorder, CounterSnapshot, PhaseRecord, TrialCounters, TrialRecorder,
};
use crate::storage::StoreLayout;
use crate::{Error, Result};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Driver progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing run yet
    Init,
    /// Reference generator is building the answer
    BuildingAnswer,
    /// Candidate trials are running
    Trials,
    /// Metrics are being computed
    Reporting,
    /// Report produced
    Done,
}

/// Result of one candidate trial.
#[derive(Debug)]
pub struct TrialOutcome {
    /// Trial index
    pub trial_id: usize,
    /// Counters of a finalized trial, or why it was aborted
    pub result: Result<TrialCounters>,
}

impl TrialOutcome {
    /// True if the trial finalized
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs the answer, the trials and the report over one [`LineSource`].
pub struct ComparisonDriver<S> {
    config: EvalConfig,
    layout: StoreLayout,
    source: S,
    state: DriverState,
    snapshot: Option<CounterSnapshot>,
}

impl<S: LineSource + Sync> ComparisonDriver<S> {
    /// Create a driver writing under `config.output_dir`
    pub fn new(config: EvalConfig, source: S) -> Self {
        let layout = config.layout();
        Self {
            config,
            layout,
            source,
            state: DriverState::Init,
            snapshot: None,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Output layout
    #[must_use]
    pub const fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Input line source
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Template every input line with `reference` and finalize the answer.
    ///
    /// Lines the reference cannot template become null records. The answer
    /// counters are persisted as a fresh snapshot with no trials.
    ///
    /// # Errors
    /// Returns the first generator, input or storage error; the answer is
    /// then left with a `Failed` marker
    pub fn build_answer<G: TemplateGenerator>(&mut self, reference: &mut G) -> Result<AnswerCounters> {
        self.state = DriverState::BuildingAnswer;
        self.snapshot = None;

        let mut recorder = AnswerRecorder::new(self.layout.clone());
        recorder.reset()?;
        if let Err(e) = self.record_answer(&mut recorder, reference) {
            recorder.abort(&e);
            return Err(e);
        }
        recorder.finalize()?;
        recorder.persist()?;

        let counters = recorder.counters().clone();
        self.snapshot = Some(CounterSnapshot::new(counters.clone()));
        Ok(counters)
    }

    fn record_answer<G: TemplateGenerator>(&self, recorder: &mut AnswerRecorder, reference: &mut G) -> Result<()> {
        for line in self.source.lines()? {
            let assignment = reference.assign(&line?)?;
            recorder.append(assignment.as_ref())?;
        }
        Ok(())
    }

    /// Run (or re-run) one candidate trial against the finalized answer and
    /// store its counters in the persisted snapshot.
    ///
    /// The candidate sees only lines whose answer record is non-null; the
    /// others are recorded as null without asking it. A failed run drops
    /// any earlier counters of the same trial.
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer is not finalized,
    /// [`Error::LengthMismatch`] if the input no longer matches the answer,
    /// or the first generator, tokenization or storage error
    pub fn run_trial<G: TemplateGenerator>(&mut self, trial_id: usize, generator: G) -> Result<TrialCounters> {
        let mut snapshot = self.current_snapshot()?;
        let result = self.record_trial(trial_id, generator);
        match &result {
            Ok(counters) => snapshot.add_trial(counters.clone()),
            Err(e) => {
                snapshot.remove_trial(trial_id);
                warn!(trial = trial_id, error = %e, "trial aborted; excluded");
            }
        }
        snapshot.persist(&self.layout)?;
        self.snapshot = Some(snapshot);
        result
    }

    /// Snapshot of the finalized answer: the in-memory one or the persisted
    /// one, checked against the answer marker.
    fn current_snapshot(&mut self) -> Result<CounterSnapshot> {
        let answer = PhaseRecord::require_finalized(&self.layout.answer_path())?;
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => CounterSnapshot::reload(&self.layout)?,
        };
        snapshot.check_answer(&answer)?;
        Ok(snapshot)
    }

    fn record_trial<G: TemplateGenerator>(&self, trial_id: usize, mut generator: G) -> Result<TrialCounters> {
        let expected = PhaseRecord::require_finalized(&self.layout.answer_path())?.records();

        let mut recorder = TrialRecorder::new(self.layout.clone(), trial_id);
        recorder.reset()?;
        if let Err(e) = self.feed_trial(&mut recorder, &mut generator, expected) {
            recorder.abort(&e);
            return Err(e);
        }
        recorder.finalize(expected)?;
        Ok(recorder.into_counters())
    }

    fn feed_trial<G: TemplateGenerator>(
        &self,
        recorder: &mut TrialRecorder,
        generator: &mut G,
        expected: u64,
    ) -> Result<()> {
        let mut answers = AnswerRecorder::replay_from(&self.layout)?;
        let mut lines = self.source.lines()?;
        loop {
            match (lines.next(), answers.next()) {
                (Some(line), Some(answer)) => {
                    let (line, answer) = (line?, answer?);
                    let trial = if answer.is_some() {
                        generator.assign(&line)?
                    } else {
                        None
                    };
                    recorder.append(trial.as_ref(), answer.as_ref())?;
                }
                (None, None) => return Ok(()),
                (Some(_), None) => {
                    return Err(Error::LengthMismatch {
                        answer: expected,
                        trial: expected + 1 + lines.count() as u64,
                    });
                }
                (None, Some(_)) => {
                    return Err(Error::LengthMismatch {
                        answer: expected,
                        trial: recorder.counters().records(),
                    });
                }
            }
        }
    }

    /// Run trials `0..n_trials`, each with a fresh candidate from `factory`,
    /// then persist the snapshot of the answer and every successful trial.
    ///
    /// Trials run on a pool of `workers` threads (0 = one per core).
    ///
    /// # Errors
    /// Returns error if the answer counters cannot be loaded, the pool cannot
    /// be built or the snapshot cannot be persisted. Individual trial
    /// failures are reported in the outcomes, not as an error.
    pub fn run_trials<G, F>(&mut self, factory: F) -> Result<Vec<TrialOutcome>>
    where
        G: TemplateGenerator,
        F: Fn(usize) -> Result<G> + Sync,
    {
        let mut snapshot = CounterSnapshot::new(self.current_snapshot()?.answer().clone());

        self.state = DriverState::Trials;
        info!(trials = self.config.n_trials, workers = self.config.workers, "running trials");
        let ids: Vec<usize> = (0..self.config.n_trials).collect();
        let outcomes = self.execute(&ids, &factory)?;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(counters) => snapshot.add_trial(counters.clone()),
                Err(e) => warn!(trial = outcome.trial_id, error = %e, "trial aborted; excluded"),
            }
        }
        snapshot.persist(&self.layout)?;
        debug!(finalized = snapshot.trials().len(), "counter snapshot persisted");

        self.snapshot = Some(snapshot);
        Ok(outcomes)
    }

    fn outcome<G, F>(&self, trial_id: usize, factory: &F) -> TrialOutcome
    where
        G: TemplateGenerator,
        F: Fn(usize) -> Result<G>,
    {
        let result = factory(trial_id).and_then(|generator| self.record_trial(trial_id, generator));
        TrialOutcome { trial_id, result }
    }

    #[cfg(feature = "parallel")]
    fn execute<G, F>(&self, ids: &[usize], factory: &F) -> Result<Vec<TrialOutcome>>
    where
        G: TemplateGenerator,
        F: Fn(usize) -> Result<G> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("ltgen-trial-{i}"))
            .build()
            .map_err(|e| Error::Other(format!("failed to build trial pool: {e}")))?;
        Ok(pool.install(|| ids.par_iter().map(|&id| self.outcome(id, factory)).collect()))
    }

    #[cfg(not(feature = "parallel"))]
    fn execute<G, F>(&self, ids: &[usize], factory: &F) -> Result<Vec<TrialOutcome>>
    where
        G: TemplateGenerator,
        F: Fn(usize) -> Result<G> + Sync,
    {
        Ok(ids.iter().map(|&id| self.outcome(id, factory)).collect())
    }

    /// Compute the report from the current snapshot (or the persisted one).
    ///
    /// # Errors
    /// Returns [`Error::DataIncomplete`] if the answer or every trial is
    /// unfinished
    pub fn report(&mut self) -> Result<Report> {
        self.state = DriverState::Reporting;
        let engine = match &self.snapshot {
            Some(snapshot) => MetricsEngine::from_snapshot(self.layout.clone(), snapshot.clone())?,
            None => MetricsEngine::load(self.layout.clone())?,
        };
        let report = engine.report()?;
        info!(trials = report.n_trials, messages = report.n_messages, "report ready");
        self.state = DriverState::Done;
        Ok(report)
    }

    /// Answer, trials and report in one go.
    ///
    /// # Errors
    /// See [`build_answer`](Self::build_answer),
    /// [`run_trials`](Self::run_trials) and [`report`](Self::report)
    pub fn run<R, G, F>(&mut self, mut reference: R, factory: F) -> Result<Report>
    where
        R: TemplateGenerator,
        G: TemplateGenerator,
        F: Fn(usize) -> Result<G> + Sync,
    {
        self.build_answer(&mut reference)?;
        self.run_trials(factory)?;
        self.report()
    }
}
