//! Pairwise clustering metrics over a contingency table
//!
//! **Problem**: Rand-style metrics are defined over all N·(N-1)/2 line
//! pairs, which is hopeless for millions of lines.
//!
//! **Solution**: every pair count is a sum of `C(n, 2)` over the cells,
//! row sums or column sums of the `(answer_cluster, trial_cluster)` count
//! table, so the cost is proportional to the number of distinct pairs.
//!
//! References:
//! - Rand (1971): Objective criteria for the evaluation of clustering methods
//! - Hubert & Arabie (1985): Comparing partitions
//! - He et al. (2016): parsing accuracy for log parsers

use crate::template::{ClusterId, TemplateAssignment};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// C(n, 2)
const fn comb2(n: u64) -> u128 {
    let n = n as u128;
    if n < 2 {
        0
    } else {
        n * (n - 1) / 2
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: u128, den: u128) -> f64 {
    num as f64 / den as f64
}

/// Line-pair counts derived from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCounts {
    /// Pairs co-clustered in both partitions (true positives)
    pub same_both: u128,
    /// Pairs co-clustered in the answer
    pub same_answer: u128,
    /// Pairs co-clustered in the trial
    pub same_trial: u128,
    /// All pairs, C(N, 2)
    pub total: u128,
}

impl PairCounts {
    /// Pairs co-clustered in the trial only
    #[must_use]
    pub const fn false_positives(&self) -> u128 {
        self.same_trial - self.same_both
    }

    /// Pairs co-clustered in the answer only
    #[must_use]
    pub const fn false_negatives(&self) -> u128 {
        self.same_answer - self.same_both
    }

    /// Pairs split in both partitions
    #[must_use]
    pub const fn true_negatives(&self) -> u128 {
        self.total + self.same_both - self.same_answer - self.same_trial
    }
}

/// All clustering-similarity scores of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusteringScores {
    /// Rand Index
    pub rand_index: f64,
    /// Adjusted Rand Index
    pub adjusted_rand_index: f64,
    /// Pairwise precision
    pub precision: f64,
    /// Pairwise recall
    pub recall: f64,
    /// Pairwise F1
    pub f1: f64,
    /// Parsing accuracy (bijective block match)
    pub parsing_accuracy: f64,
}

impl ClusteringScores {
    /// Arithmetic mean of each score; `None` for an empty slice.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(scores: &[Self]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let n = scores.len() as f64;
        let avg = |f: fn(&Self) -> f64| scores.iter().map(f).sum::<f64>() / n;
        Some(Self {
            rand_index: avg(|s| s.rand_index),
            adjusted_rand_index: avg(|s| s.adjusted_rand_index),
            precision: avg(|s| s.precision),
            recall: avg(|s| s.recall),
            f1: avg(|s| s.f1),
            parsing_accuracy: avg(|s| s.parsing_accuracy),
        })
    }
}

/// Counts per `(answer_cluster, trial_cluster)` pair.
///
/// A line the candidate left unassigned (null trial at a non-null answer)
/// is its own singleton trial cluster; it is tallied per answer row rather
/// than given a fabricated trial id.
#[derive(Debug, Clone, Default)]
pub struct ContingencyTable {
    cells: FxHashMap<(ClusterId, ClusterId), u64>,
    unassigned: FxHashMap<ClusterId, u64>,
    lines: u64,
}

impl ContingencyTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(answer_cluster, trial_cluster)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ClusterId, Option<ClusterId>)>,
    {
        let mut table = Self::new();
        for (answer, trial) in pairs {
            table.add(answer, trial);
        }
        table
    }

    /// Build by replaying an answer stream and a trial stream in lockstep,
    /// keeping only positions where the answer is non-null.
    ///
    /// # Errors
    /// Returns [`Error::LengthMismatch`] if one stream ends first, a
    /// [`Error::CorruptRecord`] if a trial record sits on a null answer, or
    /// any replay error
    pub fn from_streams<A, T>(mut answer: A, mut trial: T) -> Result<Self>
    where
        A: Iterator<Item = Result<TemplateAssignment>>,
        T: Iterator<Item = Result<TemplateAssignment>>,
    {
        let mut table = Self::new();
        let mut position = 0u64;
        loop {
            match (answer.next(), trial.next()) {
                (None, None) => break,
                (Some(a), Some(t)) => match (a?, t?) {
                    (Some(a), t) => table.add(a.cluster_id(), t.map(|t| t.cluster_id())),
                    (None, None) => {}
                    (None, Some(_)) => {
                        return Err(Error::CorruptRecord {
                            position,
                            reason: "trial record where the answer is null".to_string(),
                        })
                    }
                },
                (a, _) => {
                    let (answer, trial) = if a.is_some() {
                        (position + 1 + answer.by_ref().count() as u64, position)
                    } else {
                        (position, position + 1 + trial.by_ref().count() as u64)
                    };
                    return Err(Error::LengthMismatch { answer, trial });
                }
            }
            position += 1;
        }
        Ok(table)
    }

    /// Count one line.
    pub fn add(&mut self, answer: ClusterId, trial: Option<ClusterId>) {
        self.lines += 1;
        match trial {
            Some(trial) => *self.cells.entry((answer, trial)).or_insert(0) += 1,
            None => *self.unassigned.entry(answer).or_insert(0) += 1,
        }
    }

    /// Number of lines counted.
    #[must_use]
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn distinct_pairs(&self) -> usize {
        self.cells.len()
    }

    fn row_sums(&self) -> FxHashMap<ClusterId, u64> {
        let mut rows = self.unassigned.clone();
        for (&(answer, _), &n) in &self.cells {
            *rows.entry(answer).or_insert(0) += n;
        }
        rows
    }

    fn column_sums(&self) -> FxHashMap<ClusterId, u64> {
        let mut columns = FxHashMap::default();
        for (&(_, trial), &n) in &self.cells {
            *columns.entry(trial).or_insert(0) += n;
        }
        columns
    }

    /// Line-pair counts.
    #[must_use]
    pub fn pair_counts(&self) -> PairCounts {
        PairCounts {
            same_both: self.cells.values().map(|&n| comb2(n)).sum(),
            same_answer: self.row_sums().values().map(|&n| comb2(n)).sum(),
            same_trial: self.column_sums().values().map(|&n| comb2(n)).sum(),
            total: comb2(self.lines),
        }
    }

    /// Rand Index: agreeing pairs / all pairs. A single line agrees with
    /// itself trivially (1.0).
    #[must_use]
    pub fn rand_index(&self) -> f64 {
        let pairs = self.pair_counts();
        if pairs.total == 0 {
            return 1.0;
        }
        ratio(pairs.same_both + pairs.true_negatives(), pairs.total)
    }

    /// Adjusted Rand Index (Hubert & Arabie).
    ///
    /// Degenerate tables where both partitions are a single cluster, or both
    /// are all singletons, are identical partitions and score 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn adjusted_rand_index(&self) -> f64 {
        let pairs = self.pair_counts();
        let (sa, sb, total) = (pairs.same_answer, pairs.same_trial, pairs.total);
        if total == 0 || (sa == sb && (sa == 0 || sa == total)) {
            return 1.0;
        }

        let index = pairs.same_both as f64;
        let expected = sa as f64 * sb as f64 / total as f64;
        let max_index = (sa as f64 + sb as f64) / 2.0;
        (index - expected) / (max_index - expected)
    }

    /// Pairwise `(precision, recall, f1)` treating "same cluster" as a
    /// binary relation.
    ///
    /// With no co-clustered pair in either partition there is nothing to
    /// get wrong: all three are 1.0. An undefined ratio otherwise reads 0.0.
    #[must_use]
    pub fn pairwise_scores(&self) -> (f64, f64, f64) {
        let pairs = self.pair_counts();
        if pairs.same_answer == 0 && pairs.same_trial == 0 {
            return (1.0, 1.0, 1.0);
        }
        let precision = if pairs.same_trial == 0 {
            0.0
        } else {
            ratio(pairs.same_both, pairs.same_trial)
        };
        let recall = if pairs.same_answer == 0 {
            0.0
        } else {
            ratio(pairs.same_both, pairs.same_answer)
        };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        (precision, recall, f1)
    }

    /// Parsing accuracy: lines of answer clusters whose lines land in exactly
    /// one trial cluster holding nothing else, over all lines.
    #[must_use]
    pub fn parsing_accuracy(&self) -> f64 {
        if self.lines == 0 {
            return 0.0;
        }
        let columns = self.column_sums();

        // answer cluster -> (cells in row, trial cluster of the last cell, row sum)
        let mut rows: FxHashMap<ClusterId, (usize, ClusterId, u64)> = FxHashMap::default();
        for (&(answer, trial), &n) in &self.cells {
            let row = rows.entry(answer).or_insert((0, trial, 0));
            row.0 += 1;
            row.1 = trial;
            row.2 += n;
        }

        let correct: u64 = rows
            .iter()
            .filter(|&(answer, &(cells, trial, size))| {
                cells == 1
                    && !self.unassigned.contains_key(answer)
                    && columns.get(&trial) == Some(&size)
            })
            .map(|(_, &(_, _, size))| size)
            .sum();
        ratio(u128::from(correct), u128::from(self.lines))
    }

    /// Compute every score at once.
    ///
    /// # Errors
    /// Returns [`Error::EmptyDataset`] for a table with no lines
    pub fn scores(&self) -> Result<ClusteringScores> {
        if self.lines == 0 {
            return Err(Error::EmptyDataset(
                "no non-null answer lines to compare clusterings on".to_string(),
            ));
        }
        let (precision, recall, f1) = self.pairwise_scores();
        Ok(ClusteringScores {
            rand_index: self.rand_index(),
            adjusted_rand_index: self.adjusted_rand_index(),
            precision,
            recall,
            f1,
            parsing_accuracy: self.parsing_accuracy(),
        })
    }
}
