//! Generation timing
//!
//! Wall time of candidates templating the whole input, with no recording.
//! Trials run one after another so they do not compete for cores.

use super::{LineSource, TemplateGenerator};
use crate::{Error, Result};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// Per-trial wall times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingReport {
    laps: Vec<Duration>,
}

impl TimingReport {
    /// Wall time of each trial, in trial order
    #[must_use]
    pub fn laps(&self) -> &[Duration] {
        &self.laps
    }

    /// Sum of all laps
    #[must_use]
    pub fn total(&self) -> Duration {
        self.laps.iter().sum()
    }

    /// Mean lap; zero when no trial ran
    #[must_use]
    pub fn mean(&self) -> Duration {
        u32::try_from(self.laps.len())
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| self.total() / n)
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, lap) in self.laps.iter().enumerate() {
            writeln!(f, "trial{i:02}: {:.6}s", lap.as_secs_f64())?;
        }
        writeln!(f, "mean: {:.6}s", self.mean().as_secs_f64())
    }
}

/// Time `n_trials` fresh candidates over every line of `source`.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `n_trials` is zero, or the first input
/// or generator error
pub fn measure_time<S, G, F>(source: &S, factory: F, n_trials: usize) -> Result<TimingReport>
where
    S: LineSource,
    G: TemplateGenerator,
    F: Fn(usize) -> Result<G>,
{
    if n_trials == 0 {
        return Err(Error::InvalidInput("n_trials_time must be greater than 0".to_string()));
    }

    let mut laps = Vec::with_capacity(n_trials);
    for trial_id in 0..n_trials {
        let mut generator = factory(trial_id)?;
        let start = Instant::now();
        let mut lines = 0_u64;
        for line in source.lines()? {
            generator.assign(&line?)?;
            lines += 1;
        }
        let lap = start.elapsed();
        info!(trial = trial_id, lines, secs = lap.as_secs_f64(), "timing trial done");
        laps.push(lap);
    }
    Ok(TimingReport { laps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MemoryLineSource, TemplateTable};
    use crate::template::ClusterId;

    struct Words(TemplateTable);

    impl TemplateGenerator for Words {
        fn generate_tpl(&mut self, line: &str) -> Result<Option<Vec<String>>> {
            Ok(Some(line.split(' ').map(String::from).collect()))
        }

        fn match_table(&mut self, tokens: &[String]) -> Result<(ClusterId, bool)> {
            Ok(self.0.match_or_insert(tokens))
        }
    }

    #[test]
    fn test_one_lap_per_trial() {
        let source = MemoryLineSource::new(["a b", "a c", "a b"]);
        let report = measure_time(&source, |_| Ok(Words(TemplateTable::new())), 3).unwrap();
        assert_eq!(report.laps().len(), 3);
        assert!(report.mean() <= report.total());
        assert_eq!(report.to_string().lines().count(), 4);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let source = MemoryLineSource::new(["a"]);
        let result = measure_time(&source, |_| Ok(Words(TemplateTable::new())), 0);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_report_mean_is_zero() {
        let report = TimingReport { laps: Vec::new() };
        assert_eq!(report.mean(), Duration::ZERO);
    }
}
