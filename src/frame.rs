//! The canonical frame: a UTC-indexed table with [`ColumnKey`]-labeled
//! columns, plus the merge, gap-exposing reindex and range-trim operations
//! applied after adapters have normalized their files.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Europe::Brussels;
use serde::{Deserialize, Serialize};

use crate::error::{ReadError, TimestampAmbiguityError};
use crate::keys::ColumnKey;

/// Fixed sampling interval of a logical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "15min")]
    QuarterHour,
    #[serde(rename = "60min")]
    Hour,
}

impl Resolution {
    pub fn from_key(key: &str) -> Result<Self, ReadError> {
        match key {
            "15min" => Ok(Resolution::QuarterHour),
            "60min" => Ok(Resolution::Hour),
            other => Err(ReadError::InvalidResolution(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::QuarterHour => "15min",
            Resolution::Hour => "60min",
        }
    }

    /// Grid step between two expected timestamps.
    pub fn step(&self) -> Duration {
        match self {
            Resolution::QuarterHour => Duration::minutes(15),
            Resolution::Hour => Duration::minutes(60),
        }
    }
}

/// One labeled value column, parallel to the frame's timestamp axis.
#[derive(Debug, Clone)]
pub struct FrameColumn {
    pub key: ColumnKey,
    pub values: Vec<Option<f64>>,
}

/// UTC-indexed table. The timestamp axis is strictly increasing with no
/// duplicate instants (enforced at construction), timestamps are UTC with
/// the timezone tag stripped, and no two columns share a key.
#[derive(Debug, Clone)]
pub struct CanonicalFrame {
    index: Vec<NaiveDateTime>,
    columns: Vec<FrameColumn>,
}

impl CanonicalFrame {
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Build a frame from rows in any order. Rows are sorted by timestamp;
    /// a duplicate instant means adapter-level normalization failed and is
    /// rejected here rather than silently collapsed.
    pub fn from_rows(
        keys: Vec<ColumnKey>,
        mut rows: Vec<(NaiveDateTime, Vec<Option<f64>>)>,
    ) -> Result<Self, ReadError> {
        check_unique_keys(&keys)?;
        for (ts, values) in &rows {
            if values.len() != keys.len() {
                return Err(ReadError::Frame(format!(
                    "row at {ts} has {} values for {} columns",
                    values.len(),
                    keys.len()
                )));
            }
        }
        rows.sort_by_key(|(ts, _)| *ts);
        for (row, pair) in rows.windows(2).enumerate() {
            if pair[0].0 == pair[1].0 {
                return Err(TimestampAmbiguityError::new(
                    row + 1,
                    pair[1].0,
                    "duplicate UTC instant after normalization",
                )
                .into());
            }
        }

        let index: Vec<NaiveDateTime> = rows.iter().map(|(ts, _)| *ts).collect();
        let columns = keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| FrameColumn {
                key,
                values: rows.iter().map(|(_, values)| values[i]).collect(),
            })
            .collect();
        Ok(Self { index, columns })
    }

    /// Build a frame from an already strictly increasing index and parallel
    /// value columns.
    pub fn from_columns(
        index: Vec<NaiveDateTime>,
        columns: Vec<(ColumnKey, Vec<Option<f64>>)>,
    ) -> Result<Self, ReadError> {
        let keys: Vec<ColumnKey> = columns.iter().map(|(k, _)| k.clone()).collect();
        check_unique_keys(&keys)?;
        for (row, pair) in index.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(TimestampAmbiguityError::new(
                    row + 1,
                    pair[1],
                    "index is not strictly increasing",
                )
                .into());
            }
        }
        for (key, values) in &columns {
            if values.len() != index.len() {
                return Err(ReadError::Frame(format!(
                    "column {key} has {} values for {} timestamps",
                    values.len(),
                    index.len()
                )));
            }
        }
        let columns = columns
            .into_iter()
            .map(|(key, values)| FrameColumn { key, values })
            .collect();
        Ok(Self { index, columns })
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    pub fn column_keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.iter().map(|c| &c.key)
    }

    pub fn column_values(&self, key: &ColumnKey) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| &c.key == key)
            .map(|c| c.values.as_slice())
    }

    /// Cell lookup by instant and key.
    pub fn get(&self, ts: NaiveDateTime, key: &ColumnKey) -> Option<f64> {
        let row = self.index.binary_search(&ts).ok()?;
        self.column_values(key)?.get(row).copied().flatten()
    }

    /// Left-biased cell-wise merge: for every timestamp and key, the first
    /// non-missing value wins and `other` may only fill cells this frame
    /// left missing. Index and key sets are unioned, keys of `self` first.
    pub fn combine_first(&self, other: &CanonicalFrame) -> CanonicalFrame {
        if self.is_empty() && self.columns.is_empty() {
            return other.clone();
        }

        let index = merge_sorted(&self.index, &other.index);
        let self_pos = position_map(&self.index);
        let other_pos = position_map(&other.index);

        let mut keys: Vec<ColumnKey> = self.columns.iter().map(|c| c.key.clone()).collect();
        for col in &other.columns {
            if !keys.contains(&col.key) {
                keys.push(col.key.clone());
            }
        }

        let columns = keys
            .into_iter()
            .map(|key| {
                let own = self.column_values(&key);
                let theirs = other.column_values(&key);
                let values = index
                    .iter()
                    .map(|ts| {
                        let first = own
                            .and_then(|v| self_pos.get(ts).and_then(|&i| v[i]));
                        first.or_else(|| {
                            theirs.and_then(|v| other_pos.get(ts).and_then(|&i| v[i]))
                        })
                    })
                    .collect();
                FrameColumn { key, values }
            })
            .collect();

        CanonicalFrame { index, columns }
    }

    /// Reindex onto the complete expected grid from the first to the last
    /// timestamp, stepped by the resolution. Expected instants with no
    /// observation become all-missing rows; nothing is interpolated or
    /// filled. Instants that do not fall on the grid are dropped.
    pub fn reindex(&self, resolution: Resolution) -> CanonicalFrame {
        if self.is_empty() {
            return self.clone();
        }
        let step = resolution.step();
        let first = self.index[0];
        let last = self.index[self.index.len() - 1];

        let mut grid = Vec::new();
        let mut t = first;
        while t <= last {
            grid.push(t);
            t = t + step;
        }

        let pos = position_map(&self.index);
        let columns = self
            .columns
            .iter()
            .map(|col| FrameColumn {
                key: col.key.clone(),
                values: grid
                    .iter()
                    .map(|ts| pos.get(ts).and_then(|&i| col.values[i]))
                    .collect(),
            })
            .collect();

        CanonicalFrame {
            index: grid,
            columns,
        }
    }

    /// Slice to `[start, end]` inclusive on the UTC axis. `None` means
    /// unbounded on that side.
    pub fn slice(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> CanonicalFrame {
        let lo = match start {
            Some(s) => self.index.partition_point(|t| *t < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.index.partition_point(|t| *t <= e),
            None => self.index.len(),
        };
        let (lo, hi) = (lo.min(self.index.len()), hi.min(self.index.len()));
        if lo >= hi {
            return CanonicalFrame {
                index: Vec::new(),
                columns: self
                    .columns
                    .iter()
                    .map(|c| FrameColumn {
                        key: c.key.clone(),
                        values: Vec::new(),
                    })
                    .collect(),
            };
        }
        CanonicalFrame {
            index: self.index[lo..hi].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| FrameColumn {
                    key: c.key.clone(),
                    values: c.values[lo..hi].to_vec(),
                })
                .collect(),
        }
    }
}

/// Convert user-supplied local civil date bounds (Brussels-anchored) to UTC
/// once. The start bound is local midnight; the end bound is local midnight
/// minus one resolution step, so the bound is inclusive of the last full
/// period before the next day.
pub fn bounds_to_utc(
    resolution: Resolution,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), ReadError> {
    let start_utc = start.map(local_midnight_utc).transpose()?;
    let end_utc = end
        .map(|d| local_midnight_utc(d).map(|t| t - resolution.step()))
        .transpose()?;
    Ok((start_utc, end_utc))
}

/// Trim a frame to the caller's civil date window.
pub fn trim_range(
    frame: &CanonicalFrame,
    resolution: Resolution,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<CanonicalFrame, ReadError> {
    let (start_utc, end_utc) = bounds_to_utc(resolution, start, end)?;
    Ok(frame.slice(start_utc, end_utc))
}

fn local_midnight_utc(date: NaiveDate) -> Result<NaiveDateTime, ReadError> {
    let local = date.and_time(NaiveTime::MIN);
    match Brussels.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.naive_utc()),
        LocalResult::Ambiguous(dt, _) => Ok(dt.naive_utc()),
        LocalResult::None => Err(ReadError::Frame(format!(
            "date bound {date} has no local midnight"
        ))),
    }
}

fn check_unique_keys(keys: &[ColumnKey]) -> Result<(), ReadError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(ReadError::Frame(format!("duplicate column key {key}")));
        }
    }
    Ok(())
}

fn position_map(index: &[NaiveDateTime]) -> HashMap<NaiveDateTime, usize> {
    index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect()
}

fn merge_sorted(a: &[NaiveDateTime], b: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
