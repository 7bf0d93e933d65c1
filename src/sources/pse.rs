//! PSE (Polish TSO): hourly wind generation, cp1250-encoded.
//!
//! Hour labels name the interval *end* and need backshifting by one hour.
//! During the fall transition the repeated local hour is split across the
//! labels `02A` (summertime 02:00-03:00) and `03` (wintertime 02:00-03:00),
//! and on spring-transition days the label `03` names the real hour
//! starting at 01:00.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use chrono_tz::Europe::Berlin;

use super::{parse_date, parse_number, read_raw, AdaptRequest, CsvFormat, FileEncoding, SourceAdapter};
use crate::dst::{localize_rows, spring_gap_starts, DstPolicy, DstSide, TRANSITION_YEARS};
use crate::error::{ReadError, TimestampAmbiguityError};
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const COL_DATE: &str = "Data";
const COL_HOUR: &str = "Godzina";
const COL_WIND: &str = "Sumaryczna generacja źródeł wiatrowych";

pub struct Pse;

impl Pse {
    /// Convert one hour label into the interval start plus an optional
    /// marker hint. `02A` denotes summertime 02:00-03:00; a plain label
    /// names the interval end and is shifted back one hour.
    fn interval_start(
        label: &str,
        date: NaiveDate,
        row: usize,
    ) -> Result<(Duration, Option<DstSide>), TimestampAmbiguityError> {
        if label == "02A" {
            return Ok((Duration::hours(2), Some(DstSide::Summer)));
        }
        match label.parse::<i64>() {
            Ok(hour) if (1..=24).contains(&hour) => Ok((Duration::hours(hour - 1), None)),
            _ => Err(TimestampAmbiguityError::new(
                row,
                date.and_time(chrono::NaiveTime::MIN),
                "unexpected hour marker",
            )),
        }
    }
}

impl SourceAdapter for Pse {
    fn source_name(&self) -> &'static str {
        "PSE"
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let table = read_raw(path, CsvFormat::new(b';').encoding(FileEncoding::Cp1250))?;
        let date_idx = table.column_index(path, COL_DATE)?;
        let hour_idx = table.column_index(path, COL_HOUR)?;
        let wind_idx = table.column_index(path, COL_WIND)?;

        let spring_gaps = spring_gap_starts(Berlin, TRANSITION_YEARS);

        let mut locals = Vec::new();
        let mut rows = Vec::new();
        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_date = table.cell(row, date_idx);
            if raw_date.is_empty() {
                continue;
            }
            let date = parse_date(raw_date, false).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse date '{raw_date}'"))
            })?;
            let (offset, hint) = Self::interval_start(table.cell(row, hour_idx), date, rowno)?;
            let mut ts = date.and_time(chrono::NaiveTime::MIN) + offset;

            // On spring-transition days the label `03` lands on the skipped
            // hour; the reading belongs to the hour starting 01:00.
            if spring_gaps.contains(&ts) {
                ts = ts - Duration::hours(1);
            }

            let value = parse_number(table.cell(row, wind_idx), true, None)
                .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
            locals.push((ts, hint));
            rows.push(vec![value]);
        }

        let utc = localize_rows(&locals, Berlin, DstPolicy::InferFromOrder)?;
        let keys = vec![ColumnKey::new("wind", "PL", "generation", "PSE", req.url)];
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(rows).collect())
    }
}
