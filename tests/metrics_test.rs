//! Metrics engine tests over recorded answer and trial streams

use ltgen_eval::metrics::{ContingencyTable, MetricsEngine, TrialSelector};
use ltgen_eval::recorder::{AnswerRecorder, CounterSnapshot, PhaseRecord, TrialRecorder};
use ltgen_eval::storage::StoreLayout;
use ltgen_eval::template::Assignment;
use ltgen_eval::Error;
use tempfile::TempDir;

const EPS: f64 = 1e-9;

fn tpl(cluster_id: u64, tokens: &[&str]) -> Option<Assignment> {
    Some(Assignment::new(cluster_id, tokens.iter().copied()))
}

/// Record an answer and finalized trials, then persist the snapshot.
fn record(
    layout: &StoreLayout,
    answer: &[Option<Assignment>],
    trials: &[Vec<Option<Assignment>>],
) -> MetricsEngine {
    let mut recorder = AnswerRecorder::new(layout.clone());
    recorder.reset().unwrap();
    for a in answer {
        recorder.append(a.as_ref()).unwrap();
    }
    recorder.finalize().unwrap();
    recorder.persist().unwrap();

    let mut snapshot = CounterSnapshot::new(AnswerRecorder::reload(layout).unwrap());
    for (id, trial) in trials.iter().enumerate() {
        let mut recorder = TrialRecorder::new(layout.clone(), id);
        recorder.reset().unwrap();
        for (t, a) in trial.iter().zip(answer) {
            recorder.append(t.as_ref(), a.as_ref()).unwrap();
        }
        recorder.finalize(answer.len() as u64).unwrap();
        snapshot.add_trial(recorder.into_counters());
    }
    snapshot.persist(layout).unwrap();

    MetricsEngine::load(layout.clone()).unwrap()
}

fn workspace() -> (TempDir, StoreLayout) {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path().join("measure_ltgen"));
    (dir, layout)
}

#[test]
fn test_relabeled_trial_scores_perfectly() {
    let (_dir, layout) = workspace();
    let answer = vec![tpl(1, &["a", "1"]), tpl(1, &["a", "2"]), tpl(2, &["b", "x"])];
    let trial = vec![tpl(10, &["a", "1"]), tpl(10, &["a", "2"]), tpl(20, &["b", "x"])];
    let engine = record(&layout, &answer, &[trial]);

    let t0 = TrialSelector::Trial(0);
    assert!((engine.line_accuracy(t0).unwrap() - 1.0).abs() < EPS);
    assert!((engine.word_accuracy(t0).unwrap() - 1.0).abs() < EPS);
    assert!((engine.rand_score(t0).unwrap() - 1.0).abs() < EPS);
    assert!((engine.adjusted_rand_score(t0).unwrap() - 1.0).abs() < EPS);
    assert!((engine.f1_score(t0).unwrap() - 1.0).abs() < EPS);
    assert!((engine.parsing_accuracy(t0).unwrap() - 1.0).abs() < EPS);
    assert!((engine.number_of_trial_clusters(t0).unwrap() - 2.0).abs() < EPS);
}

#[test]
fn test_merged_clusters_break_parsing_accuracy() {
    let (_dir, layout) = workspace();
    let answer = vec![tpl(1, &["a", "*"]), tpl(1, &["a", "*"]), tpl(2, &["b", "*"])];
    let trial = vec![tpl(5, &["a", "*"]), tpl(5, &["a", "*"]), tpl(5, &["b", "*"])];
    let engine = record(&layout, &answer, &[trial]);

    let t0 = TrialSelector::Trial(0);
    // Tokens are right, grouping is not
    assert!((engine.line_accuracy(t0).unwrap() - 1.0).abs() < EPS);
    assert!(engine.parsing_accuracy(t0).unwrap().abs() < EPS);
    // One agreeing pair (lines 0,1) out of three
    assert!((engine.rand_score(t0).unwrap() - 1.0 / 3.0).abs() < EPS);
    assert!(engine.adjusted_rand_score(t0).unwrap().abs() < EPS);
    assert!((engine.f1_score(t0).unwrap() - 0.5).abs() < EPS);
}

#[test]
fn test_tokenization_mismatch_rejected_at_append() {
    let (_dir, layout) = workspace();
    let mut answer = AnswerRecorder::new(layout.clone());
    answer.reset().unwrap();
    let a = tpl(1, &["x", "y", "z"]);
    answer.append(a.as_ref()).unwrap();
    answer.finalize().unwrap();

    let mut trial = TrialRecorder::new(layout.clone(), 0);
    trial.reset().unwrap();
    let t = tpl(1, &["x", "y"]);
    let err = trial.append(t.as_ref(), a.as_ref()).unwrap_err();
    assert!(matches!(
        err,
        Error::TokenizationMismatch {
            position: 0,
            answer_len: 3,
            trial_len: 2
        }
    ));
}

#[test]
fn test_no_messages_reads_no_data() {
    let (_dir, layout) = workspace();
    let engine = record(&layout, &[None, None], &[vec![None, None]]);

    assert_eq!(engine.number_of_messages(), 0);
    assert!(matches!(
        engine.line_accuracy(TrialSelector::Mean),
        Err(Error::EmptyDataset(_))
    ));
    assert!(matches!(
        engine.rand_score(TrialSelector::Trial(0)),
        Err(Error::EmptyDataset(_))
    ));

    let report = engine.report().unwrap();
    assert_eq!(report.n_messages, 0);
    assert!(report.line_accuracy.is_none());
    assert!(report.rand_index.is_none());
    assert!(report.to_string().contains("word accuracy: no data"));
}

#[test]
fn test_mean_over_trials() {
    let (_dir, layout) = workspace();
    let answer = vec![tpl(1, &["a"]), tpl(2, &["b"])];
    let exact = vec![tpl(0, &["a"]), tpl(1, &["b"])];
    let half = vec![tpl(0, &["a"]), tpl(1, &["c"])];
    let engine = record(&layout, &answer, &[exact, half]);

    assert_eq!(engine.number_of_trials(), 2);
    assert!((engine.line_accuracy(TrialSelector::Trial(1)).unwrap() - 0.5).abs() < EPS);
    assert!((engine.line_accuracy(TrialSelector::Mean).unwrap() - 0.75).abs() < EPS);
    assert!((engine.word_accuracy(TrialSelector::Mean).unwrap() - 0.75).abs() < EPS);
    assert!((engine.template_accuracy(TrialSelector::Mean).unwrap() - 0.75).abs() < EPS);
    // Same partition in both trials
    assert!((engine.parsing_accuracy(TrialSelector::Mean).unwrap() - 1.0).abs() < EPS);

    let report = engine.report().unwrap();
    assert_eq!(report.n_trials, 2);
    assert_eq!(report.n_messages, 2);
    assert_eq!(report.n_answer_clusters, 2);
    assert!(report.to_string().contains("line accuracy: 0.750000"));
}

#[test]
fn test_template_accuracy_is_macro_averaged() {
    let (_dir, layout) = workspace();
    // Cluster 1 has three lines, cluster 2 one line
    let answer = vec![tpl(1, &["a"]), tpl(1, &["a"]), tpl(1, &["a"]), tpl(2, &["b"])];
    let trial = vec![tpl(0, &["a"]), tpl(0, &["a"]), tpl(0, &["a"]), tpl(1, &["c"])];
    let engine = record(&layout, &answer, &[trial]);

    let t0 = TrialSelector::Trial(0);
    assert!((engine.line_accuracy(t0).unwrap() - 0.75).abs() < EPS);
    assert!((engine.template_accuracy(t0).unwrap() - 0.5).abs() < EPS);
    assert!((engine.template_word_accuracy(t0).unwrap() - 0.5).abs() < EPS);
}

#[test]
fn test_null_trial_is_a_singleton() {
    let (_dir, layout) = workspace();
    let answer = vec![tpl(1, &["a"]), tpl(1, &["a"]), tpl(2, &["b"])];
    let trial = vec![tpl(0, &["a"]), None, tpl(1, &["b"])];
    let engine = record(&layout, &answer, &[trial]);

    let t0 = TrialSelector::Trial(0);
    // Cluster 1 is split, cluster 2 is intact
    assert!((engine.parsing_accuracy(t0).unwrap() - 1.0 / 3.0).abs() < EPS);
    assert!((engine.line_accuracy(t0).unwrap() - 2.0 / 3.0).abs() < EPS);
    let table = engine.contingency(0).unwrap();
    assert_eq!(table.lines(), 3);
}

#[test]
fn test_unfinalized_trial_is_excluded() {
    let (_dir, layout) = workspace();
    let answer = vec![tpl(1, &["a"]), tpl(2, &["b"])];
    let trial = vec![tpl(0, &["a"]), tpl(1, &["b"])];
    record(&layout, &answer, &[trial.clone(), trial]);

    // Trial 1 loses its marker as if it had been killed before finalizing
    PhaseRecord::clear_marker(&layout.trial_path(1)).unwrap();

    let engine = MetricsEngine::load(layout.clone()).unwrap();
    assert_eq!(engine.number_of_trials(), 1);
    assert_eq!(engine.trial_ids(), &[0]);
    assert!(matches!(
        engine.line_accuracy(TrialSelector::Trial(1)),
        Err(Error::DataIncomplete(_))
    ));
    assert!(matches!(engine.contingency(1), Err(Error::DataIncomplete(_))));
    assert!((engine.line_accuracy(TrialSelector::Mean).unwrap() - 1.0).abs() < EPS);
}

#[test]
fn test_report_requires_a_finalized_trial() {
    let (_dir, layout) = workspace();
    let engine = record(&layout, &[tpl(1, &["a"])], &[]);
    assert!(matches!(engine.report(), Err(Error::DataIncomplete(_))));
    assert!(matches!(
        engine.line_accuracy(TrialSelector::Mean),
        Err(Error::DataIncomplete(_))
    ));
}

#[test]
fn test_load_without_answer_marker() {
    let (_dir, layout) = workspace();
    let mut recorder = AnswerRecorder::new(layout.clone());
    recorder.reset().unwrap();
    recorder.append(tpl(1, &["a"]).as_ref()).unwrap();

    assert!(matches!(
        MetricsEngine::load(layout),
        Err(Error::DataIncomplete(_))
    ));
}

#[test]
fn test_contingency_from_pairs_matches_sklearn_ari() {
    // labels_true = [0,0,0,1,1,1], labels_pred = [0,0,1,1,2,2]
    let table = ContingencyTable::from_pairs([
        (0, Some(0)),
        (0, Some(0)),
        (0, Some(1)),
        (1, Some(1)),
        (1, Some(2)),
        (1, Some(2)),
    ]);
    assert!((table.adjusted_rand_index() - 0.242_424_242_424_242_4).abs() < 1e-9);
    assert!((table.rand_index() - 10.0 / 15.0).abs() < EPS);
}
