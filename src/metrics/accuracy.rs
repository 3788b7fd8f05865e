//! Counter-based accuracies
//!
//! These need no replay: the recorders already accumulated every numerator
//! and denominator.

use crate::recorder::{AnswerCounters, TrialCounters};
use crate::{Error, Result};

fn require_lines(answer: &AnswerCounters) -> Result<()> {
    if answer.lines() == 0 {
        return Err(Error::EmptyDataset(
            "the answer has no non-null lines".to_string(),
        ));
    }
    Ok(())
}

/// Correct tokens / all answer tokens.
///
/// # Errors
/// Returns [`Error::EmptyDataset`] if the answer has no lines or no tokens
#[allow(clippy::cast_precision_loss)]
pub fn word_accuracy(answer: &AnswerCounters, trial: &TrialCounters) -> Result<f64> {
    require_lines(answer)?;
    if answer.words() == 0 {
        return Err(Error::EmptyDataset("the answer templates have no tokens".to_string()));
    }
    Ok(trial.correct_words() as f64 / answer.words() as f64)
}

/// Exactly-correct lines / all answer lines.
///
/// # Errors
/// Returns [`Error::EmptyDataset`] if the answer has no lines
#[allow(clippy::cast_precision_loss)]
pub fn line_accuracy(answer: &AnswerCounters, trial: &TrialCounters) -> Result<f64> {
    require_lines(answer)?;
    Ok(trial.correct_lines() as f64 / answer.lines() as f64)
}

/// Macro-average over answer clusters of correct lines / cluster lines.
///
/// Every cluster weighs the same regardless of size.
///
/// # Errors
/// Returns [`Error::EmptyDataset`] if the answer has no lines
#[allow(clippy::cast_precision_loss)]
pub fn template_accuracy(answer: &AnswerCounters, trial: &TrialCounters) -> Result<f64> {
    require_lines(answer)?;
    let per_cluster: Vec<f64> = answer
        .clusters()
        .map(|c| trial.cluster_correct_lines(c) as f64 / answer.cluster_lines(c) as f64)
        .collect();
    Ok(per_cluster.iter().sum::<f64>() / per_cluster.len() as f64)
}

/// Macro-average over answer clusters of correct tokens / cluster tokens.
///
/// Clusters whose template has no tokens have nothing to score and are
/// left out.
///
/// # Errors
/// Returns [`Error::EmptyDataset`] if no cluster has a token
#[allow(clippy::cast_precision_loss)]
pub fn template_word_accuracy(answer: &AnswerCounters, trial: &TrialCounters) -> Result<f64> {
    require_lines(answer)?;
    let per_cluster: Vec<f64> = answer
        .clusters()
        .filter(|&c| answer.cluster_words(c) > 0)
        .map(|c| trial.cluster_correct_words(c) as f64 / answer.cluster_words(c) as f64)
        .collect();
    if per_cluster.is_empty() {
        return Err(Error::EmptyDataset("the answer templates have no tokens".to_string()));
    }
    Ok(per_cluster.iter().sum::<f64>() / per_cluster.len() as f64)
}
