//! Plain-text evaluation report

use serde::Serialize;
use std::fmt;

/// Every metric of one evaluation run, averaged over finalized trials.
///
/// Ratio metrics are `None` ("no data") when the answer has no non-null
/// lines to score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Finalized trials the averages run over
    pub n_trials: usize,
    /// Non-null answer lines
    pub n_messages: u64,
    /// Distinct ground-truth clusters
    pub n_answer_clusters: usize,
    /// Mean number of candidate clusters
    pub n_trial_clusters: Option<f64>,
    /// Word accuracy
    pub word_accuracy: Option<f64>,
    /// Line accuracy
    pub line_accuracy: Option<f64>,
    /// Per-cluster template accuracy
    pub template_accuracy: Option<f64>,
    /// Per-cluster template-word accuracy
    pub template_word_accuracy: Option<f64>,
    /// Rand Index
    pub rand_index: Option<f64>,
    /// Adjusted Rand Index
    pub adjusted_rand_index: Option<f64>,
    /// Pairwise F1
    pub f1: Option<f64>,
    /// Parsing accuracy
    pub parsing_accuracy: Option<f64>,
}

struct Value(Option<f64>);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.6}"),
            None => f.write_str("no data"),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "number of trials: {}", self.n_trials)?;
        writeln!(f, "number of messages: {}", self.n_messages)?;
        writeln!(f, "number of clusters in answer: {}", self.n_answer_clusters)?;
        writeln!(f, "number of clusters in trial: {}", Value(self.n_trial_clusters))?;
        writeln!(f)?;
        writeln!(f, "word accuracy: {}", Value(self.word_accuracy))?;
        writeln!(f, "line accuracy: {}", Value(self.line_accuracy))?;
        writeln!(f, "tpl accuracy: {}", Value(self.template_accuracy))?;
        writeln!(f, "tpl word accuracy: {}", Value(self.template_word_accuracy))?;
        writeln!(f, "rand score: {}", Value(self.rand_index))?;
        writeln!(f, "adjusted rand score: {}", Value(self.adjusted_rand_index))?;
        writeln!(f, "f1 score: {}", Value(self.f1))?;
        writeln!(f, "parsing accuracy: {}", Value(self.parsing_accuracy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_rendering() {
        let report = Report {
            n_trials: 2,
            n_messages: 0,
            n_answer_clusters: 0,
            n_trial_clusters: None,
            word_accuracy: None,
            line_accuracy: None,
            template_accuracy: None,
            template_word_accuracy: None,
            rand_index: None,
            adjusted_rand_index: None,
            f1: None,
            parsing_accuracy: None,
        };
        let text = report.to_string();
        assert!(text.contains("number of messages: 0"));
        assert!(text.contains("line accuracy: no data"));
        assert!(text.contains("parsing accuracy: no data"));
    }

    #[test]
    fn test_one_metric_per_line() {
        let report = Report {
            n_trials: 1,
            n_messages: 3,
            n_answer_clusters: 2,
            n_trial_clusters: Some(2.0),
            word_accuracy: Some(1.0),
            line_accuracy: Some(1.0),
            template_accuracy: Some(1.0),
            template_word_accuracy: Some(1.0),
            rand_index: Some(1.0),
            adjusted_rand_index: Some(1.0),
            f1: Some(1.0),
            parsing_accuracy: Some(0.5),
        };
        let text = report.to_string();
        assert_eq!(text.lines().count(), 13);
        assert!(text.contains("parsing accuracy: 0.500000"));
    }
}
