//! German renewable capacity: one value per day, published as a compiled
//! register extract. Daily values are forward-filled across every intraday
//! step up to the end of the last reported day, then laid onto the series
//! resolution. This is the only place in the pipeline where forward-fill
//! is legitimate; gaps elsewhere stay gaps.

use std::path::Path;

use chrono::{Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Europe::Berlin;

use super::{parse_date, parse_number, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::error::{ReadError, TimestampAmbiguityError};
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const COL_DAY: &str = "day";
const SOURCE: &str = "BNetzA and Netztransparenz.de";

fn column_map(url: &str) -> Vec<(&'static str, ColumnKey)> {
    vec![
        ("Solar", ColumnKey::new("solar", "DE", "capacity", SOURCE, url)),
        ("Onshore", ColumnKey::new("wind-onshore", "DE", "capacity", SOURCE, url)),
        ("Offshore", ColumnKey::new("wind-offshore", "DE", "capacity", SOURCE, url)),
    ]
}

pub struct Opsd;

impl SourceAdapter for Opsd {
    fn source_name(&self) -> &'static str {
        "OPSD"
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let table = read_raw(path, CsvFormat::new(b','))?;
        let day_idx = table.column_index(path, COL_DAY)?;
        let colmap = column_map(req.url);
        let indices = colmap
            .iter()
            .map(|(name, _)| table.column_index(path, name))
            .collect::<Result<Vec<_>, _>>()?;

        // One anchor per reported day, at local midnight converted to UTC.
        let mut anchors: Vec<(NaiveDateTime, Vec<Option<f64>>)> = Vec::new();
        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_day = table.cell(row, day_idx);
            if raw_day.is_empty() {
                continue;
            }
            let day = parse_date(raw_day, false).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse day '{raw_day}'"))
            })?;
            let local = day.and_time(chrono::NaiveTime::MIN);
            let utc = match Berlin.from_local_datetime(&local) {
                LocalResult::Single(dt) => dt.naive_utc(),
                _ => {
                    return Err(TimestampAmbiguityError::new(
                        rowno,
                        local,
                        "midnight does not map to a single instant",
                    )
                    .into())
                }
            };
            let mut values = Vec::with_capacity(indices.len());
            for &idx in &indices {
                let value = parse_number(table.cell(row, idx), false, None)
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            anchors.push((utc, values));
        }
        anchors.sort_by_key(|(ts, _)| *ts);

        let keys: Vec<ColumnKey> = colmap.into_iter().map(|(_, key)| key).collect();
        if anchors.is_empty() {
            return CanonicalFrame::from_rows(keys, Vec::new());
        }

        // Broadcast each day's value until the next anchor, covering the
        // last reported day through its final sub-daily step.
        let first = anchors[0].0;
        let last_anchor = anchors[anchors.len() - 1].0;
        let end = last_anchor + Duration::hours(23) + Duration::minutes(59);
        let step = req.resolution.step();

        let mut rows = Vec::new();
        let mut cursor = 0usize;
        let mut t = first;
        while t <= end {
            while cursor + 1 < anchors.len() && anchors[cursor + 1].0 <= t {
                cursor += 1;
            }
            rows.push((t, anchors[cursor].1.clone()));
            t = t + step;
        }

        CanonicalFrame::from_rows(keys, rows)
    }
}
