//! # ltgen-eval: Streaming Evaluation of Log Template Generators
//!
//! **Version**: 0.1.0
//!
//! Scores a candidate log template generator against a reference one. The
//! reference templates every input line once (the *answer*); the candidate
//! templates the same lines in several independent *trials*. Both are
//! streamed to disk record by record, so memory stays proportional to the
//! number of clusters, not the number of lines.
//!
//! ## Metrics
//!
//! - **Accuracy**: word, line, per-cluster template and template-word
//!   accuracy, read from running counters
//! - **Clustering**: Rand Index, Adjusted Rand Index, pairwise F1 and parsing
//!   accuracy, from a contingency table built by replaying both streams
//!
//! Every metric is available per trial or as the mean over finalized trials.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ltgen_eval::config::EvalConfig;
//! use ltgen_eval::metrics::{MetricsEngine, TrialSelector};
//!
//! let config = EvalConfig::from_json_file("eval.json")?;
//! let engine = MetricsEngine::load(config.layout())?;
//!
//! println!("mean ARI: {:.4}", engine.adjusted_rand_score(TrialSelector::Mean)?);
//! println!("{}", engine.report()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod storage;
pub mod template;

pub use error::{Error, Result};
