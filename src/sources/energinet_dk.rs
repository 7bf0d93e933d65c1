//! Energinet.dk: hourly spot prices and Danish wind/solar generation.
//!
//! Hours are reported 1..24 and name the interval end. Rows landing in the
//! spring gap are excluded via the transition calendar; the fall-back hour
//! is always reported in summertime.

use std::path::Path;

use chrono::Duration;
use chrono_tz::Europe::Copenhagen;

use super::{parse_date, parse_number, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::dst::{localize_series, spring_gap_starts, DstPolicy, DstSide, TRANSITION_YEARS};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const COL_DATE: usize = 0;
const COL_HOUR: usize = 1;
const SKIP_ROWS: usize = 2;
const SOURCE: &str = "Energinet.dk";

fn column_map(url: &str) -> Vec<(&'static str, ColumnKey)> {
    vec![
        ("DK-West", ColumnKey::new("price", "DK-west", "elspot", SOURCE, url)),
        ("DK-East", ColumnKey::new("price", "DK-east", "elspot", SOURCE, url)),
        ("Norway", ColumnKey::new("price", "NO", "elspot", SOURCE, url)),
        ("Sweden (SE)", ColumnKey::new("price", "SE", "elspot", SOURCE, url)),
        ("Sweden (SE3)", ColumnKey::new("price", "SE-3", "elspot", SOURCE, url)),
        ("Sweden (SE4)", ColumnKey::new("price", "SE-4", "elspot", SOURCE, url)),
        (
            "DE European Power Exchange",
            ColumnKey::new("price", "DE", "epex", SOURCE, url),
        ),
        (
            "DK-West: Wind power production",
            ColumnKey::new("wind", "DK-west", "generation", SOURCE, url),
        ),
        (
            "DK-West: Solar cell production (estimated)",
            ColumnKey::new("solar", "DK-west", "generation", SOURCE, url),
        ),
        (
            "DK-East: Wind power production",
            ColumnKey::new("wind", "DK-east", "generation", SOURCE, url),
        ),
        (
            "DK-East: Solar cell production (estimated)",
            ColumnKey::new("solar", "DK-east", "generation", SOURCE, url),
        ),
        (
            "DK: Wind power production (onshore)",
            ColumnKey::new("wind-onshore", "DK", "generation", SOURCE, url),
        ),
        (
            "DK: Wind power production (offshore)",
            ColumnKey::new("wind-offshore", "DK", "generation", SOURCE, url),
        ),
    ]
}

pub struct EnerginetDk;

impl SourceAdapter for EnerginetDk {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let table = read_raw(path, CsvFormat::new(b';').skip_rows(SKIP_ROWS))?;

        let colmap = column_map(req.url);
        let indices = colmap
            .iter()
            .map(|(name, _)| table.column_index(path, name))
            .collect::<Result<Vec<_>, _>>()?;

        let spring_gaps = spring_gap_starts(Copenhagen, TRANSITION_YEARS);

        let mut stamps = Vec::new();
        let mut rows = Vec::new();
        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_date = table.cell(row, COL_DATE);
            if raw_date.is_empty() {
                continue;
            }
            let date = parse_date(raw_date, false).ok_or_else(|| {
                ReadError::format(path, format!("row {rowno}: cannot parse date '{raw_date}'"))
            })?;
            let raw_hour = table.cell(row, COL_HOUR);
            let hour: i64 = raw_hour.parse().map_err(|_| {
                ReadError::format(path, format!("row {rowno}: cannot parse hour '{raw_hour}'"))
            })?;
            if !(1..=24).contains(&hour) {
                return Err(ReadError::format(
                    path,
                    format!("row {rowno}: hour {hour} outside 1..24"),
                ));
            }
            // End-labeled hours: 1 means 00:00-01:00.
            let ts = date.and_time(chrono::NaiveTime::MIN) + Duration::hours(hour - 1);

            // The file carries a phantom third hour on spring-transition
            // days; those rows are dropped, not localized.
            if spring_gaps.contains(&ts) {
                continue;
            }

            let mut values = Vec::with_capacity(indices.len());
            for &idx in &indices {
                let value = parse_number(table.cell(row, idx), false, Some(','))
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            stamps.push(ts);
            rows.push(values);
        }

        let utc = localize_series(
            &stamps,
            Copenhagen,
            DstPolicy::FixedAssignment(DstSide::Summer),
        )?;
        let keys = colmap.into_iter().map(|(_, key)| key).collect();
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(rows).collect())
    }
}
