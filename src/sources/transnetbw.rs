//! TransnetBW (German TSO): quarter-hourly forecast and generation.
//!
//! The usable date/time columns label the *end* of each quarter-hour, so
//! the whole axis is shifted back by one period after UTC conversion.

use std::path::Path;

use chrono::Duration;
use chrono_tz::Europe::Berlin;

use super::{parse_date, parse_number, parse_time_hm, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::dst::{localize_series, DstPolicy};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

/// Positions of the end-labeled date/time pair and the two value columns;
/// the leading start-labeled pair is unreliable in the raw exports.
const COL_DATE: usize = 2;
const COL_TIME: usize = 3;
const VALUE_COLS: [(usize, &str); 2] = [(4, "forecast"), (5, "generation")];

pub struct TransnetBw;

impl SourceAdapter for TransnetBw {
    fn source_name(&self) -> &'static str {
        "TransnetBW"
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let table = read_raw(path, CsvFormat::new(b';'))?;

        let mut stamps = Vec::new();
        let mut rows = Vec::new();
        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_date = table.cell(row, COL_DATE);
            if raw_date.is_empty() {
                continue;
            }
            let date = parse_date(raw_date, true).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse date '{raw_date}'"))
            })?;
            let raw_time = table.cell(row, COL_TIME);
            let time = parse_time_hm(raw_time).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse time '{raw_time}'"))
            })?;
            let mut values = Vec::with_capacity(VALUE_COLS.len());
            for (idx, _) in VALUE_COLS {
                let value = parse_number(table.cell(row, idx), true, None)
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            stamps.push(date.and_time(time));
            rows.push(values);
        }

        let utc = localize_series(&stamps, Berlin, DstPolicy::InferFromOrder)?;
        let backshifted = utc.into_iter().map(|t| t - Duration::minutes(15));

        let keys = VALUE_COLS
            .iter()
            .map(|(_, attribute)| {
                ColumnKey::new(req.series, "DE-transnetbw", *attribute, "TransnetBW", req.url)
            })
            .collect();
        CanonicalFrame::from_rows(keys, backshifted.zip(rows).collect())
    }
}
