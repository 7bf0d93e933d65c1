//! Elia (Belgian TSO): quarter-hourly forecast, generation and capacity.

use std::path::Path;

use chrono_tz::Europe::Brussels;

use super::{parse_datetime, parse_number, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::dst::{localize_series, DstPolicy};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

/// Raw column positions fixed for Elia exports: timestamp, then forecast,
/// generation and capacity with an unused column between timestamp and
/// forecast.
const COL_TIMESTAMP: usize = 0;
const VALUE_COLS: [(usize, &str); 3] = [(2, "forecast"), (4, "generation"), (5, "capacity")];
const SKIP_ROWS: usize = 4;

pub struct Elia;

impl SourceAdapter for Elia {
    fn source_name(&self) -> &'static str {
        "Elia"
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let table = read_raw(path, CsvFormat::new(b';').skip_rows(SKIP_ROWS).headerless())?;

        let mut stamps = Vec::new();
        let mut rows = Vec::new();
        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_ts = table.cell(row, COL_TIMESTAMP);
            if raw_ts.is_empty() {
                continue;
            }
            let ts = parse_datetime(raw_ts).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse timestamp '{raw_ts}'"))
            })?;
            let mut values = Vec::with_capacity(VALUE_COLS.len());
            for (idx, _) in VALUE_COLS {
                let value = parse_number(table.cell(row, idx), false, None)
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            stamps.push(ts);
            rows.push(values);
        }

        let utc = localize_series(&stamps, Brussels, DstPolicy::InferFromOrder)?;
        let keys = VALUE_COLS
            .iter()
            .map(|(_, attribute)| ColumnKey::new(req.series, "BE", *attribute, "Elia", req.url))
            .collect();
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(rows).collect())
    }
}
