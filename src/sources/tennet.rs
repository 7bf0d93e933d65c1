//! TenneT (German TSO): quarter-hourly solar and wind series.
//!
//! Instead of clock times the files carry a quarter-hour "position" 1..96
//! per day. On DST-affected days the reported sequence is wrong in a
//! reproducible way and has to be corrected before clock time can be
//! recomputed:
//!
//! - the spring day ends at position 92, with the jump mislabeled: the
//!   readings from position 9 onward belong one hour later;
//! - the fall day runs to position 100; the readings from position 13
//!   onward belong one hour earlier, which doubles the 02:00 hour and is
//!   then resolved by recording order.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use chrono_tz::Europe::Berlin;
use log::debug;

use super::{parse_date, parse_number, read_raw, AdaptRequest, CsvFormat, FileEncoding, SourceAdapter};
use crate::dst::{localize_series, DstPolicy};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const COL_DATE: usize = 0;
const COL_POSITION: usize = 1;
const SKIP_ROWS: usize = 3;

struct Row {
    date: NaiveDate,
    pos: i64,
    values: Vec<Option<f64>>,
}

pub struct Tennet;

impl Tennet {
    fn keys(series: &str, url: &str) -> Option<(Vec<usize>, Vec<ColumnKey>)> {
        match series {
            "solar" => Some((
                vec![2, 3],
                vec![
                    ColumnKey::new("solar", "DE-tennet", "forecast", "TenneT", url),
                    ColumnKey::new("solar", "DE-tennet", "generation", "TenneT", url),
                ],
            )),
            "wind" => Some((
                vec![2, 3, 4],
                vec![
                    ColumnKey::new("wind", "DE-tennet", "forecast", "TenneT", url),
                    ColumnKey::new("wind", "DE-tennet", "generation", "TenneT", url),
                    ColumnKey::new("wind-offshore", "DE-tennet", "generation", "TenneT", url),
                ],
            )),
            _ => None,
        }
    }

    /// Correct the position sequence on DST-affected days. Mirrors the
    /// historically observed file anomalies exactly; anything else out of
    /// range is rejected by the caller.
    fn correct_positions(rows: &mut [Row]) {
        let has_101 = rows.iter().any(|r| r.pos == 101);

        for i in 0..rows.len() {
            // Spring day: the sequence ends at 92; readings from position
            // 9 onward belong one hour later.
            if rows[i].pos == 92 && (i == rows.len() - 1 || rows[i + 1].pos == 1) {
                let date = rows[i].date;
                for row in rows.iter_mut() {
                    if row.date == date && row.pos >= 9 {
                        row.pos += 4;
                    }
                }
            } else if rows[i].pos > 96 {
                debug!(
                    "position {} on {} at row {}",
                    rows[i].pos, rows[i].date, i
                );
                // Fall day: the sequence runs to 100; set readings from
                // position 13 onward back one hour so it ends at 96 and
                // the 02:00 hour doubles.
                if rows[i].pos == 100 && !has_101 {
                    let date = rows[i].date;
                    for row in rows.iter_mut() {
                        if row.date == date && row.pos >= 13 {
                            row.pos -= 4;
                        }
                    }
                }
            }
        }
    }
}

impl SourceAdapter for Tennet {
    fn source_name(&self) -> &'static str {
        "TenneT"
    }

    fn validate(&self, series: &str) -> Result<(), ReadError> {
        match Self::keys(series, "") {
            Some(_) => Ok(()),
            None => Err(ReadError::UnknownSeries {
                source_name: "TenneT".to_string(),
                series: series.to_string(),
            }),
        }
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let (value_cols, keys) =
            Self::keys(req.series, req.url).ok_or_else(|| ReadError::UnknownSeries {
                source_name: "TenneT".to_string(),
                series: req.series.to_string(),
            })?;

        let table = read_raw(
            path,
            CsvFormat::new(b';')
                .skip_rows(SKIP_ROWS)
                .encoding(FileEncoding::Latin1),
        )?;

        let mut rows: Vec<Row> = Vec::new();
        let mut last_date: Option<NaiveDate> = None;
        for (rowno, raw) in table.rows.iter().enumerate() {
            let raw_pos = table.cell(raw, COL_POSITION);
            if raw_pos.is_empty() {
                continue;
            }
            // Date cells are only written on the first row of each day.
            let raw_date = table.cell(raw, COL_DATE);
            let date = if raw_date.is_empty() {
                last_date.ok_or_else(|| {
                    ReadError::format(path, format!("row {rowno}: no date to carry forward"))
                })?
            } else {
                parse_date(raw_date, true).ok_or_else(|| {
                    ReadError::format(path, format!("row {rowno}: cannot parse date '{raw_date}'"))
                })?
            };
            last_date = Some(date);

            let pos: i64 = raw_pos.parse().map_err(|_| {
                ReadError::format(path, format!("row {rowno}: cannot parse position '{raw_pos}'"))
            })?;

            let mut values = Vec::with_capacity(value_cols.len());
            for &idx in &value_cols {
                let value = parse_number(table.cell(raw, idx), false, None)
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            rows.push(Row { date, pos, values });
        }

        Self::correct_positions(&mut rows);

        let mut stamps = Vec::with_capacity(rows.len());
        let mut cells = Vec::with_capacity(rows.len());
        for row in rows {
            if !(1..=96).contains(&row.pos) {
                return Err(ReadError::format(
                    path,
                    format!("position {} on {} outside 1..96", row.pos, row.date),
                ));
            }
            let hour = (row.pos - 1) / 4;
            let minute = ((row.pos - 1) % 4) * 15;
            let ts = row.date.and_time(chrono::NaiveTime::MIN)
                + Duration::hours(hour)
                + Duration::minutes(minute);
            stamps.push(ts);
            cells.push(row.values);
        }

        let utc = localize_series(&stamps, Berlin, DstPolicy::InferFromOrder)?;
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(cells).collect())
    }
}
