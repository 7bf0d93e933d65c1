//! Error taxonomy for the reader pipeline.
//!
//! Configuration problems abort a whole `read` call, format and timestamp
//! problems are fatal for the affected file only, and structural problems
//! are downgraded to warnings that skip the affected container.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Fatal condition raised while reading one source file or dispatching a job.
#[derive(Error, Debug)]
pub enum ReadError {
    /// No adapter is registered under this source name.
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    /// The source exists but does not provide the requested logical series.
    #[error("source '{source_name}' does not provide series '{series}'")]
    UnknownSeries { source_name: String, series: String },

    /// The source is registered but its file format is not implemented.
    #[error("source '{0}' is not supported yet")]
    UnsupportedSource(String),

    /// Unexpected file layout or an unparseable cell.
    #[error("{}: {detail}", path.display())]
    Format { path: PathBuf, detail: String },

    /// A raw column required by the static column mapping is absent.
    #[error("{}: missing expected column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// The requested resolution key is not one of '15min' / '60min'.
    #[error("invalid resolution key '{0}'")]
    InvalidResolution(String),

    /// Frame construction invariant violated (column shape, duplicate keys,
    /// or a date bound that cannot be converted).
    #[error("invalid frame: {0}")]
    Frame(String),

    #[error(transparent)]
    Ambiguity(#[from] TimestampAmbiguityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ReadError {
    pub fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ReadError::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn missing_column(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        ReadError::MissingColumn {
            path: path.into(),
            column: column.into(),
        }
    }
}

/// A local timestamp that the declared DST policy cannot map to a single
/// UTC instant. Fatal for the file; no best-effort guess is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {row}: local time {local} cannot be resolved: {reason}")]
pub struct TimestampAmbiguityError {
    /// 0-based position of the offending row in the localized sequence.
    pub row: usize,
    pub local: NaiveDateTime,
    pub reason: &'static str,
}

impl TimestampAmbiguityError {
    pub fn new(row: usize, local: NaiveDateTime, reason: &'static str) -> Self {
        Self { row, local, reason }
    }
}

/// Non-fatal structural finding; the affected unit is skipped and the
/// pipeline continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadWarning {
    /// `<out_path>/<source>/<series>` does not exist.
    MissingSeriesDir { source: String, series: String },
    /// A container directory holds no data file.
    NoFiles { container: PathBuf },
    /// A container directory holds more than one file.
    MultipleFiles { container: PathBuf, count: usize },
    /// The file is too small to hold data and is probably an empty download.
    FileTooSmall { path: PathBuf, bytes: u64 },
    /// The container directory name does not parse as `<start>_<end>` dates.
    UnparsableContainer { container: PathBuf },
    /// Every container was skipped or failed; the returned frame is empty.
    EmptyResult { source: String, series: String },
}

impl std::fmt::Display for ReadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadWarning::MissingSeriesDir { source, series } => {
                write!(f, "folder not found for {source}, {series}")
            }
            ReadWarning::NoFiles { container } => {
                write!(f, "found no file in {}", container.display())
            }
            ReadWarning::MultipleFiles { container, count } => {
                write!(f, "found {count} files in {}", container.display())
            }
            ReadWarning::FileTooSmall { path, bytes } => {
                write!(f, "{} is only {bytes} bytes, probably empty", path.display())
            }
            ReadWarning::UnparsableContainer { container } => {
                write!(f, "cannot parse period from {}", container.display())
            }
            ReadWarning::EmptyResult { source, series } => {
                write!(f, "returned empty frame for {source}, {series}")
            }
        }
    }
}

/// A file-level fatal condition that did not abort the rest of the series.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ReadError,
}
