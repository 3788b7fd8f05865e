//! Aggregate counters accumulated while streams are recorded
//!
//! Per-cluster maps hold one entry per cluster id, never one per line, and
//! read missing keys as zero.

use crate::template::{Assignment, ClusterId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn count(map: &BTreeMap<ClusterId, u64>, cluster_id: ClusterId) -> u64 {
    map.get(&cluster_id).copied().unwrap_or(0)
}

fn bump(map: &mut BTreeMap<ClusterId, u64>, cluster_id: ClusterId, by: u64) {
    *map.entry(cluster_id).or_insert(0) += by;
}

/// Running aggregates of the ground-truth stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCounters {
    records: u64,
    lines: u64,
    words: u64,
    cluster_lines: BTreeMap<ClusterId, u64>,
    cluster_words: BTreeMap<ClusterId, u64>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

impl AnswerCounters {
    /// Start of the answer run these counters were recorded in.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Total records, null ones included.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Non-null answer lines (message coverage).
    #[must_use]
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// Tokens over all non-null answer lines.
    #[must_use]
    pub const fn words(&self) -> u64 {
        self.words
    }

    /// Lines assigned to `cluster_id`.
    #[must_use]
    pub fn cluster_lines(&self, cluster_id: ClusterId) -> u64 {
        count(&self.cluster_lines, cluster_id)
    }

    /// Tokens over lines assigned to `cluster_id`.
    #[must_use]
    pub fn cluster_words(&self, cluster_id: ClusterId) -> u64 {
        count(&self.cluster_words, cluster_id)
    }

    /// Ground-truth cluster ids in ascending order.
    pub fn clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.cluster_lines.keys().copied()
    }

    /// Number of distinct ground-truth clusters.
    #[must_use]
    pub fn number_of_clusters(&self) -> usize {
        self.cluster_lines.len()
    }

    pub(crate) fn bind(&mut self, started_at: Option<DateTime<Utc>>) {
        self.started_at = started_at;
    }

    pub(crate) fn record(&mut self, assignment: Option<&Assignment>) {
        self.records += 1;
        if let Some(a) = assignment {
            let words = a.len() as u64;
            self.lines += 1;
            self.words += words;
            bump(&mut self.cluster_lines, a.cluster_id(), 1);
            bump(&mut self.cluster_words, a.cluster_id(), words);
        }
    }
}

/// Correctness of one trial record, computed before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrialDelta {
    answer_cluster: Option<ClusterId>,
    trial_cluster: Option<ClusterId>,
    line_correct: bool,
    words_correct: u64,
}

impl TrialDelta {
    /// Score `trial` against `answer` at `position`.
    pub(crate) fn score(
        trial: Option<&Assignment>,
        answer: Option<&Assignment>,
        position: u64,
    ) -> Result<Self> {
        let Some(answer) = answer else {
            if trial.is_some() {
                return Err(Error::InvalidInput(format!(
                    "line {position}: trial record given where the answer is null"
                )));
            }
            return Ok(Self {
                answer_cluster: None,
                trial_cluster: None,
                line_correct: false,
                words_correct: 0,
            });
        };

        let Some(trial) = trial else {
            return Ok(Self {
                answer_cluster: Some(answer.cluster_id()),
                trial_cluster: None,
                line_correct: false,
                words_correct: 0,
            });
        };

        if trial.len() != answer.len() {
            return Err(Error::TokenizationMismatch {
                position,
                answer_len: answer.len(),
                trial_len: trial.len(),
            });
        }

        let words_correct = trial
            .tokens()
            .iter()
            .zip(answer.tokens())
            .filter(|(t, a)| t == a)
            .count() as u64;

        Ok(Self {
            answer_cluster: Some(answer.cluster_id()),
            trial_cluster: Some(trial.cluster_id()),
            line_correct: trial.tokens() == answer.tokens(),
            words_correct,
        })
    }
}

/// Running correctness aggregates of one trial stream.
///
/// Correct counts are keyed by the *answer's* cluster id: the trial's own
/// ids live in an unrelated id space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialCounters {
    trial_id: usize,
    records: u64,
    correct_lines: u64,
    correct_words: u64,
    cluster_correct_lines: BTreeMap<ClusterId, u64>,
    cluster_correct_words: BTreeMap<ClusterId, u64>,
    trial_cluster_lines: BTreeMap<ClusterId, u64>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

impl TrialCounters {
    /// Create empty counters for `trial_id`.
    #[must_use]
    pub const fn new(trial_id: usize) -> Self {
        Self {
            trial_id,
            records: 0,
            correct_lines: 0,
            correct_words: 0,
            cluster_correct_lines: BTreeMap::new(),
            cluster_correct_words: BTreeMap::new(),
            trial_cluster_lines: BTreeMap::new(),
            started_at: None,
        }
    }

    /// Trial index.
    #[must_use]
    pub const fn trial_id(&self) -> usize {
        self.trial_id
    }

    /// Total records, null ones included.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Lines whose tokens exactly equal the answer's.
    #[must_use]
    pub const fn correct_lines(&self) -> u64 {
        self.correct_lines
    }

    /// Tokens equal to the answer token at the same position.
    #[must_use]
    pub const fn correct_words(&self) -> u64 {
        self.correct_words
    }

    /// Correct lines within ground-truth cluster `cluster_id`.
    #[must_use]
    pub fn cluster_correct_lines(&self, cluster_id: ClusterId) -> u64 {
        count(&self.cluster_correct_lines, cluster_id)
    }

    /// Correct tokens within ground-truth cluster `cluster_id`.
    #[must_use]
    pub fn cluster_correct_words(&self, cluster_id: ClusterId) -> u64 {
        count(&self.cluster_correct_words, cluster_id)
    }

    /// Number of distinct clusters the candidate produced.
    #[must_use]
    pub fn number_of_clusters(&self) -> usize {
        self.trial_cluster_lines.len()
    }

    /// Start of the trial run these counters were recorded in.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub(crate) fn bind(&mut self, started_at: Option<DateTime<Utc>>) {
        self.started_at = started_at;
    }

    pub(crate) fn apply(&mut self, delta: TrialDelta) {
        self.records += 1;
        if let Some(trial_cluster) = delta.trial_cluster {
            bump(&mut self.trial_cluster_lines, trial_cluster, 1);
        }
        let Some(answer_cluster) = delta.answer_cluster else {
            return;
        };
        if delta.line_correct {
            self.correct_lines += 1;
            bump(&mut self.cluster_correct_lines, answer_cluster, 1);
        }
        if delta.words_correct > 0 {
            self.correct_words += delta.words_correct;
            bump(&mut self.cluster_correct_words, answer_cluster, delta.words_correct);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_counters_skip_null() {
        let mut counters = AnswerCounters::default();
        counters.record(Some(&Assignment::new(1, ["a", "b"])));
        counters.record(None);
        counters.record(Some(&Assignment::new(1, ["a", "c"])));
        counters.record(Some(&Assignment::new(2, ["x"])));

        assert_eq!(counters.records(), 4);
        assert_eq!(counters.lines(), 3);
        assert_eq!(counters.words(), 5);
        assert_eq!(counters.cluster_lines(1), 2);
        assert_eq!(counters.cluster_words(1), 4);
        assert_eq!(counters.cluster_lines(99), 0);
        assert_eq!(counters.number_of_clusters(), 2);
    }

    #[test]
    fn test_trial_delta_partial_match() {
        let answer = Assignment::new(1, ["a", "b", "c"]);
        let trial = Assignment::new(40, ["a", "**", "c"]);
        let delta = TrialDelta::score(Some(&trial), Some(&answer), 0).unwrap();

        let mut counters = TrialCounters::new(0);
        counters.apply(delta);
        assert_eq!(counters.correct_lines(), 0);
        assert_eq!(counters.correct_words(), 2);
        assert_eq!(counters.cluster_correct_words(1), 2);
        assert_eq!(counters.cluster_correct_lines(1), 0);
        assert_eq!(counters.number_of_clusters(), 1);
    }

    #[test]
    fn test_trial_delta_length_mismatch() {
        let answer = Assignment::new(1, ["a", "b", "c"]);
        let trial = Assignment::new(1, ["a", "b"]);
        let err = TrialDelta::score(Some(&trial), Some(&answer), 5).unwrap_err();
        assert!(matches!(
            err,
            Error::TokenizationMismatch { position: 5, answer_len: 3, trial_len: 2 }
        ));
    }

    #[test]
    fn test_trial_delta_null_answer_occupies_slot() {
        let mut counters = TrialCounters::new(2);
        counters.apply(TrialDelta::score(None, None, 0).unwrap());
        assert_eq!(counters.records(), 1);
        assert_eq!(counters.correct_lines(), 0);
        assert_eq!(counters.number_of_clusters(), 0);
    }

    #[test]
    fn test_trial_record_against_null_answer_rejected() {
        let trial = Assignment::new(1, ["a"]);
        assert!(matches!(
            TrialDelta::score(Some(&trial), None, 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_trial_scores_zero() {
        let answer = Assignment::new(3, ["a"]);
        let mut counters = TrialCounters::new(0);
        counters.apply(TrialDelta::score(None, Some(&answer), 0).unwrap());
        assert_eq!(counters.records(), 1);
        assert_eq!(counters.correct_words(), 0);
        assert_eq!(counters.cluster_correct_lines(3), 0);
    }

    #[test]
    fn test_counters_json_roundtrip() {
        let mut counters = AnswerCounters::default();
        counters.record(Some(&Assignment::new(17, ["a"])));
        let json = serde_json::to_string(&counters).unwrap();
        let back: AnswerCounters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counters);
    }
}
