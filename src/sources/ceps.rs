//! CEPS (Czech TSO): hourly wind and solar generation.

use std::path::Path;

use chrono_tz::Europe::Brussels;

use super::{parse_datetime, parse_number, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::dst::{localize_series, DstPolicy};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

pub struct Ceps;

impl SourceAdapter for Ceps {
    fn source_name(&self) -> &'static str {
        "CEPS"
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        // Two title rows above the header; first column holds the local
        // timestamp.
        let table = read_raw(path, CsvFormat::new(b';').skip_rows(2))?;

        let colmap = [
            ("WPP [MW]", ColumnKey::new("wind-onshore", "CZ", "generation", "CEPS", req.url)),
            ("PVPP [MW]", ColumnKey::new("solar", "CZ", "generation", "CEPS", req.url)),
        ];
        let indices = colmap
            .iter()
            .map(|(name, _)| table.column_index(path, name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stamps = Vec::new();
        let mut rows = Vec::new();
        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_ts = table.cell(row, 0);
            if raw_ts.is_empty() {
                continue;
            }
            let ts = parse_datetime(raw_ts).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse timestamp '{raw_ts}'"))
            })?;
            let mut values = Vec::with_capacity(indices.len());
            for &idx in &indices {
                let value = parse_number(table.cell(row, idx), false, None)
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            stamps.push(ts);
            rows.push(values);
        }

        let utc = localize_series(&stamps, Brussels, DstPolicy::InferFromOrder)?;
        let keys = colmap.into_iter().map(|(_, key)| key).collect();
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(rows).collect())
    }
}
