//! Orchestration: walk the on-disk layout, dispatch each file to its
//! adapter, merge, reindex, trim.
//!
//! Layout consumed: `<out_path>/<source>/<series>/<container>/<file>`,
//! where `container` is named `<start>_<end>` with ISO dates and holds
//! exactly one data file. Structural problems skip the affected container;
//! format and timestamp problems abort only the affected file; prior
//! aggregated data always survives.

use std::path::PathBuf;

use chrono::NaiveDate;
use glob::glob;
use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{FileFailure, ReadError, ReadWarning};
use crate::frame::{trim_range, CanonicalFrame, Resolution};
use crate::keys::{ColumnDescription, ColumnKeySchema};
use crate::sources::{adapter_for, AdaptRequest};

/// Files below this size are almost certainly empty downloads.
const MIN_FILE_BYTES: u64 = 128;

/// One read job: which source/series to load, where the files live and
/// which civil-date window to keep.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub source: String,
    /// Logical series id, e.g. `wind` or `wind_generation_with-offshore`.
    pub series: String,
    /// Source URL recorded in every column key.
    pub url: String,
    pub resolution: Resolution,
    pub schema: ColumnKeySchema,
    /// Base directory holding the downloaded per-source trees.
    pub out_path: PathBuf,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Count event emitted after each processed file. Rendering is the
/// caller's concern; emission never blocks.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Outcome of one read job. An empty frame is explicit: the warnings tell
/// whether nothing was provided, nothing matched, or every file failed.
#[derive(Debug)]
pub struct ReadReport {
    pub frame: CanonicalFrame,
    pub warnings: Vec<ReadWarning>,
    pub failures: Vec<FileFailure>,
    pub files_total: usize,
    pub files_read: usize,
}

impl ReadReport {
    /// Resolve every column key for the downstream metadata generator.
    pub fn describe_columns(&self, schema: &ColumnKeySchema) -> Vec<ColumnDescription> {
        self.frame
            .column_keys()
            .map(|key| schema.describe(key))
            .collect()
    }

    fn empty(warnings: Vec<ReadWarning>, files_total: usize) -> Self {
        Self {
            frame: CanonicalFrame::empty(),
            warnings,
            failures: Vec::new(),
            files_total,
            files_read: 0,
        }
    }
}

pub fn read(request: &ReadRequest) -> Result<ReadReport, ReadError> {
    read_with_progress(request, &mut |_| {})
}

pub fn read_with_progress(
    request: &ReadRequest,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<ReadReport, ReadError> {
    let adapter = adapter_for(&request.source)
        .ok_or_else(|| ReadError::UnknownSource(request.source.clone()))?;
    adapter.validate(&request.series)?;

    info!("reading {} - {}", request.source, request.series);

    let series_dir = request.out_path.join(&request.source).join(&request.series);
    if !series_dir.is_dir() {
        let warning = ReadWarning::MissingSeriesDir {
            source: request.source.clone(),
            series: request.series.clone(),
        };
        warn!("{warning}");
        return Ok(ReadReport::empty(vec![warning], 0));
    }

    let files_total = WalkDir::new(&series_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count();

    // Container names sort chronologically, which is the merge precedence
    // order: the earliest reporting period is authoritative on overlap.
    let mut containers: Vec<PathBuf> = std::fs::read_dir(&series_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    containers.sort();

    let period_re = Regex::new(r"^(\d{4}-\d{2}-\d{2})_(\d{4}-\d{2}-\d{2})$").unwrap();

    let mut warnings = Vec::new();
    let mut failures = Vec::new();
    let mut aggregate = CanonicalFrame::empty();
    let mut files_read = 0usize;
    on_progress(Progress {
        done: 0,
        total: files_total,
    });

    for container in containers {
        let name = container
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let period = period_re.captures(name).and_then(|caps| {
            let covered_start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
            let covered_end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok()?;
            Some((covered_start, covered_end))
        });

        // Skip containers whose reporting period is outside the window.
        match period {
            Some((covered_start, covered_end)) => {
                if request.start.map_or(false, |s| s > covered_end)
                    || request.end.map_or(false, |e| e < covered_start)
                {
                    continue;
                }
            }
            None => {
                if request.start.is_some() || request.end.is_some() {
                    let warning = ReadWarning::UnparsableContainer {
                        container: container.clone(),
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                    continue;
                }
            }
        }

        let pattern = container.join("*");
        let files: Vec<PathBuf> = glob(pattern.to_string_lossy().as_ref())
            .map_err(|e| ReadError::format(&container, format!("bad file pattern: {e}")))?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect();

        if files.is_empty() {
            let warning = ReadWarning::NoFiles {
                container: container.clone(),
            };
            warn!("{warning}");
            warnings.push(warning);
            continue;
        }
        if files.len() > 1 {
            let warning = ReadWarning::MultipleFiles {
                container: container.clone(),
                count: files.len(),
            };
            warn!("{warning}");
            warnings.push(warning);
            continue;
        }

        let filepath = &files[0];
        let bytes = std::fs::metadata(filepath)?.len();
        if bytes < MIN_FILE_BYTES {
            let warning = ReadWarning::FileTooSmall {
                path: filepath.clone(),
                bytes,
            };
            warn!("{warning}");
            warnings.push(warning);
            continue;
        }

        debug!(
            "reading data: source {}, series {}, file {}",
            request.source,
            request.series,
            filepath.display()
        );

        let adapt_request = AdaptRequest {
            series: request.series.as_str(),
            url: request.url.as_str(),
            resolution: request.resolution,
        };
        match adapter.adapt(filepath, &adapt_request) {
            Ok(frame) => {
                aggregate = if aggregate.is_empty() {
                    frame
                } else {
                    aggregate.combine_first(&frame)
                };
                files_read += 1;
            }
            Err(error) => {
                warn!("failed to read {}: {error}", filepath.display());
                failures.push(FileFailure {
                    path: filepath.clone(),
                    error,
                });
            }
        }
        on_progress(Progress {
            done: files_read,
            total: files_total,
        });
    }

    if aggregate.is_empty() {
        let warning = ReadWarning::EmptyResult {
            source: request.source.clone(),
            series: request.series.clone(),
        };
        warn!("{warning}");
        warnings.push(warning);
        return Ok(ReadReport {
            frame: aggregate,
            warnings,
            failures,
            files_total,
            files_read,
        });
    }

    let reindexed = aggregate.reindex(request.resolution);
    let frame = trim_range(&reindexed, request.resolution, request.start, request.end)?;

    Ok(ReadReport {
        frame,
        warnings,
        failures,
        files_total,
        files_read,
    })
}
