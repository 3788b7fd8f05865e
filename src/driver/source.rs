//! Restartable input line sources

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// Lazy iterator over input lines
pub type LineIter<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// A finite, ordered input that can be read again from the start.
///
/// Every call to [`lines`](LineSource::lines) must yield the same lines in the
/// same order; the answer and every trial are aligned by position.
pub trait LineSource {
    /// Start a new pass over the input.
    ///
    /// # Errors
    /// Returns error if the input cannot be opened
    fn lines(&self) -> Result<LineIter<'_>>;
}

/// Lines held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLineSource {
    lines: Vec<String>,
}

impl MemoryLineSource {
    /// Wrap a list of lines
    pub fn new<T: Into<String>>(lines: impl IntoIterator<Item = T>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if there are no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineSource for MemoryLineSource {
    fn lines(&self) -> Result<LineIter<'_>> {
        Ok(Box::new(self.lines.iter().cloned().map(Ok)))
    }
}

/// Lines of one or more text files, read lazily in order.
///
/// Trailing whitespace is trimmed and blank lines are skipped.
#[derive(Debug, Clone)]
pub struct FileLineSource {
    paths: Vec<PathBuf>,
}

impl FileLineSource {
    /// Read `paths` in the given order
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for FileLineSource {
    fn lines(&self) -> Result<LineIter<'_>> {
        // Open everything up front so a missing file fails the pass, not a line
        let readers = self
            .paths
            .iter()
            .map(|path| File::open(path).map(BufReader::new))
            .collect::<std::io::Result<Vec<_>>>()?;

        let lines = readers
            .into_iter()
            .flat_map(BufRead::lines)
            .filter_map(|line| match line {
                Ok(line) => {
                    let trimmed = line.trim_end();
                    (!trimmed.is_empty()).then(|| Ok(trimmed.to_string()))
                }
                Err(e) => Some(Err(Error::from(e))),
            });
        Ok(Box::new(lines))
    }
}
