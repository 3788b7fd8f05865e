//! Measurement recording (answer and trial streams)
//!
//! Recording is memory-saving: each line's assignment is appended to a
//! text stream as it is produced, and only per-cluster counters stay in
//! memory.
//!
//! ## Schema Overview
//!
//! ```text
//! AnswerRecorder (1) ──> answer stream + AnswerCounters
//!        │ replay (read-only, concurrent)
//!        ▼
//! TrialRecorder (N) ──> trialNN stream + TrialCounters
//!        │
//!        ▼
//! CounterSnapshot (info.json) = AnswerCounters + [TrialCounters]
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ltgen_eval::recorder::{AnswerRecorder, TrialRecorder};
//! use ltgen_eval::storage::StoreLayout;
//! use ltgen_eval::template::Assignment;
//!
//! # fn main() -> ltgen_eval::Result<()> {
//! let layout = StoreLayout::new("measure_ltgen");
//!
//! let mut answer = AnswerRecorder::new(layout.clone());
//! answer.reset()?;
//! answer.append(Some(&Assignment::new(1, ["session", "opened"])))?;
//! let records = answer.finalize()?.records();
//!
//! let mut trial = TrialRecorder::new(layout, 0);
//! trial.reset()?;
//! for record in answer.replay()? {
//!     let record = record?;
//!     trial.append(record.as_ref(), record.as_ref())?;
//! }
//! trial.finalize(records)?;
//! # Ok(())
//! # }
//! ```

mod answer;
mod counters;
mod phase;
mod snapshot;
mod trial;

pub use answer::AnswerRecorder;
pub use counters::{AnswerCounters, TrialCounters};
pub use phase::{PhaseRecord, PhaseStatus};
pub use snapshot::CounterSnapshot;
pub use trial::TrialRecorder;
