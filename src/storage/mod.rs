//! Stream storage (newline-delimited template records)
//!
//! **Append-Only Design**:
//! - One record per source line, written in call order
//! - No random updates; a stream is either rebuilt from scratch or left alone
//! - Replay is lazy: a buffered reader yields one record at a time, so a
//!   multi-million line stream never has to fit in memory
//!
//! Directory layout under the configured output directory:
//!
//! ```text
//! measure_ltgen/
//! ├── answer          ground-truth stream
//! ├── answer.done     finalization marker (PhaseRecord JSON)
//! ├── trial00         candidate stream, trial 0
//! ├── trial00.done
//! ├── ...
//! └── info.json       counter snapshot
//! ```

use crate::template::{decode_record, encode_record, Assignment, TemplateAssignment};
use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

/// Write buffer for stream appends (64KB)
const WRITE_BUFFER_BYTES: usize = 64 * 1024;

/// File name of the counter snapshot
const SNAPSHOT_FILE: &str = "info.json";

/// Suffix of finalization marker files
const MARKER_SUFFIX: &str = "done";

/// Paths of every artifact in one evaluation output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Create a layout rooted at `root` (not touched until [`ensure`](Self::ensure)).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the output directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Output directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ground-truth stream
    #[must_use]
    pub fn answer_path(&self) -> PathBuf {
        self.root.join("answer")
    }

    /// Candidate stream of one trial (`trial00`, `trial01`, ...)
    #[must_use]
    pub fn trial_path(&self, trial_id: usize) -> PathBuf {
        self.root.join(format!("trial{trial_id:02}"))
    }

    /// Finalization marker belonging to a stream
    #[must_use]
    pub fn marker_path(stream: &Path) -> PathBuf {
        stream.with_extension(MARKER_SUFFIX)
    }

    /// Counter snapshot
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }
}

/// Remove a file, treating "already gone" as success.
pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Append-only writer for one record stream.
///
/// A failed write poisons the writer: the file may now end in a partial
/// record, so every later append is refused.
pub struct StreamWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
    poisoned: bool,
}

impl StreamWriter {
    /// Create (or truncate) the stream at `path`.
    ///
    /// # Errors
    /// Returns error if the file cannot be created
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::with_capacity(WRITE_BUFFER_BYTES, file),
            records: 0,
            poisoned: false,
        })
    }

    /// Stream path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended so far
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Append one record.
    ///
    /// The record is fully encoded (and validated) before any byte is
    /// written, so a validation failure leaves the stream untouched.
    ///
    /// # Errors
    /// Returns [`Error::DelimiterCollision`] for an unencodable token, or
    /// [`Error::StorageIo`] if the write fails or the writer is poisoned
    pub fn append(&mut self, assignment: Option<&Assignment>) -> Result<()> {
        if self.poisoned {
            return Err(Error::StorageIo(std::io::Error::other(format!(
                "stream {} is poisoned by an earlier write failure",
                self.path.display()
            ))));
        }

        let mut line = encode_record(assignment, self.records)?;
        line.push('\n');

        if let Err(e) = self.writer.write_all(line.as_bytes()) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.records += 1;
        Ok(())
    }

    /// Flush and sync the stream, returning the record count.
    ///
    /// # Errors
    /// Returns error if buffered data cannot reach the disk
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.records)
    }
}

/// Lazy replay of one record stream.
///
/// Every replay holds its own file handle, so any number of readers can
/// replay the same finalized stream concurrently.
pub struct StreamReplay {
    lines: Lines<BufReader<File>>,
    position: u64,
}

impl StreamReplay {
    /// Open a stream for replay from the first record.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            position: 0,
        })
    }

    /// Number of records yielded so far
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }
}

impl Iterator for StreamReplay {
    type Item = Result<TemplateAssignment>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        let record = decode_record(&line, self.position);
        self.position += 1;
        Some(record)
    }
}
