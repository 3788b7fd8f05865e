//! Error types for ltgen-eval
//!
//! Every variant carries enough context to act on: which line, which phase,
//! and what to do next.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ltgen-eval error types
#[derive(Error, Debug)]
pub enum Error {
    /// Metrics or replay requested on a phase without a finalization marker
    #[error("Data incomplete: {0}\nThe phase was aborted or never finished; reset and re-run it")]
    DataIncomplete(String),

    /// Answer and trial templates disagree on token count at a shared position
    #[error("Tokenization mismatch at line {position}: answer has {answer_len} tokens, trial has {trial_len}\nThe candidate generator and the reference tokenizer disagree on granularity")]
    TokenizationMismatch {
        /// Zero-based line position
        position: u64,
        /// Token count of the answer template
        answer_len: usize,
        /// Token count of the trial template
        trial_len: usize,
    },

    /// Metric requested against zero non-null answer lines
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Append, replay or persist failure
    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    /// A token would corrupt the newline-delimited stream
    #[error("Token {token:?} at line {position} contains the record delimiter or a line break\nThe stream format defines no escaping; normalize tokens before recording")]
    DelimiterCollision {
        /// Zero-based line position
        position: u64,
        /// Offending token
        token: String,
    },

    /// A persisted record could not be decoded
    #[error("Corrupt record at line {position}: {reason}")]
    CorruptRecord {
        /// Zero-based line position
        position: u64,
        /// What was wrong with it
        reason: String,
    },

    /// Two streams that must be aligned have different lengths
    #[error("Length mismatch: answer has {answer} records, trial has {trial}\nThe line source must yield identical input on every pass")]
    LengthMismatch {
        /// Answer record count
        answer: u64,
        /// Trial record (or input line) count
        trial: u64,
    },

    /// Snapshot, marker or config (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by a template generator
    #[error("Generator error: {0}")]
    Generator(String),

    /// API misuse or invalid configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
