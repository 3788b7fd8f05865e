//! Metrics benchmarks
//!
//! Benchmarks for the evaluation hot paths:
//! - Contingency table construction and scoring
//! - Streaming answer/trial recording
//! - Replaying a recorded trial into a contingency table

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ltgen_eval::metrics::ContingencyTable;
use ltgen_eval::recorder::{AnswerRecorder, TrialRecorder};
use ltgen_eval::storage::StoreLayout;
use ltgen_eval::template::{Assignment, ClusterId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random `(answer, trial)` cluster pairs where the trial mostly agrees
fn random_pairs(lines: usize, clusters: u64) -> Vec<(ClusterId, Option<ClusterId>)> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..lines)
        .map(|_| {
            let answer = rng.gen_range(0..clusters);
            let trial = if rng.gen_bool(0.9) {
                Some(answer * 3)
            } else {
                Some(rng.gen_range(0..clusters * 2))
            };
            (answer, trial)
        })
        .collect()
}

fn random_answer(lines: usize, clusters: u64) -> Vec<Option<Assignment>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..lines)
        .map(|i| {
            let cluster = rng.gen_range(0..clusters);
            Some(Assignment::new(
                cluster,
                [format!("event{cluster}"), "from".to_string(), format!("{i}")],
            ))
        })
        .collect()
}

fn bench_contingency(c: &mut Criterion) {
    let mut group = c.benchmark_group("contingency");

    for lines in [1_000, 10_000, 100_000] {
        let pairs = random_pairs(lines, 50);
        group.bench_with_input(BenchmarkId::new("build_and_score", lines), &pairs, |b, pairs| {
            b.iter(|| {
                let table = ContingencyTable::from_pairs(pairs.iter().copied());
                black_box(table.scores().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("recording");
    group.sample_size(20);

    for lines in [1_000, 10_000] {
        let answer = random_answer(lines, 50);
        group.bench_with_input(BenchmarkId::new("answer_and_trial", lines), &answer, |b, answer| {
            let dir = tempfile::tempdir().unwrap();
            let layout = StoreLayout::new(dir.path());
            b.iter(|| {
                let mut recorder = AnswerRecorder::new(layout.clone());
                recorder.reset().unwrap();
                for a in answer {
                    recorder.append(a.as_ref()).unwrap();
                }
                recorder.finalize().unwrap();

                let mut trial = TrialRecorder::new(layout.clone(), 0);
                trial.reset().unwrap();
                for a in answer {
                    trial.append(a.as_ref(), a.as_ref()).unwrap();
                }
                black_box(trial.finalize(answer.len() as u64).unwrap().correct_lines())
            });
        });
    }

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(20);

    let lines = 10_000;
    let answer = random_answer(lines, 50);
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());

    let mut recorder = AnswerRecorder::new(layout.clone());
    recorder.reset().unwrap();
    let mut trial = TrialRecorder::new(layout.clone(), 0);
    trial.reset().unwrap();
    for a in &answer {
        recorder.append(a.as_ref()).unwrap();
        trial.append(a.as_ref(), a.as_ref()).unwrap();
    }
    recorder.finalize().unwrap();
    trial.finalize(lines as u64).unwrap();

    group.bench_function(BenchmarkId::new("streams_to_contingency", lines), |b| {
        b.iter(|| {
            let table = ContingencyTable::from_streams(
                AnswerRecorder::replay_from(&layout).unwrap(),
                TrialRecorder::replay_from(&layout, 0).unwrap(),
            )
            .unwrap();
            black_box(table.adjusted_rand_index())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_contingency, bench_recording, bench_replay);
criterion_main!(benches);
