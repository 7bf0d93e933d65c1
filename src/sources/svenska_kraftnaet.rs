//! Svenska Kraftnät: hourly Swedish wind (and later solar) generation.
//!
//! Timestamps are Swedish *normaltid*, standard time the whole year, so
//! UTC is obtained by deducting one hour; no DST policy is involved. The
//! sheet layout changed across publication eras.

use std::path::Path;

use chrono::Duration;

use super::{parse_date, parse_datetime, parse_number, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const SOURCE: &str = "Svenska Kraftnaet";

/// Marker of the sum row appended below the data table in later sheets.
const SUM_ROW_MARKER: &str = "Tot summa GWh";

enum Layout {
    /// Early sheets: date and `HH00` hour columns, wind only.
    DateHour { skip: usize },
    /// Later sheets: one timestamp column, wind and solar.
    Timestamp { skip: usize },
}

impl Layout {
    fn for_series(series: &str) -> Layout {
        match series {
            "wind_solar_1" | "wind_solar_2" => Layout::DateHour { skip: 4 },
            "wind_solar_4" => Layout::Timestamp { skip: 5 },
            _ => Layout::Timestamp { skip: 7 },
        }
    }
}

pub struct SvenskaKraftnaet;

impl SourceAdapter for SvenskaKraftnaet {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let (frame_keys, stamps, rows) = match Layout::for_series(req.series) {
            Layout::DateHour { skip } => {
                let table = read_raw(path, CsvFormat::new(b';').skip_rows(skip).headerless())?;
                let mut stamps = Vec::new();
                let mut rows = Vec::new();
                for (rowno, row) in table.rows.iter().enumerate() {
                    let raw_date = table.cell(row, 0);
                    // The sum row below the table has no date cell.
                    let Some(date) = parse_date(raw_date, false) else {
                        continue;
                    };
                    let raw_hour = table.cell(row, 1);
                    let hour: u32 = raw_hour
                        .parse::<u32>()
                        .map(|h| if h >= 100 { h / 100 } else { h })
                        .map_err(|_| {
                            ReadError::format(
                                path,
                                format!("row {rowno}: cannot parse hour '{raw_hour}'"),
                            )
                        })?;
                    let ts = date.and_time(chrono::NaiveTime::MIN) + Duration::hours(hour as i64);
                    let value = parse_number(table.cell(row, 3), false, None)
                        .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                    stamps.push(ts);
                    rows.push(vec![value]);
                }
                let keys = vec![ColumnKey::new("wind", "SE", "generation", SOURCE, req.url)];
                (keys, stamps, rows)
            }
            Layout::Timestamp { skip } => {
                let table = read_raw(path, CsvFormat::new(b';').skip_rows(skip).headerless())?;
                let mut stamps = Vec::new();
                let mut rows = Vec::new();
                for (rowno, row) in table.rows.iter().enumerate() {
                    let raw_ts = table.cell(row, 0);
                    if raw_ts.is_empty() || raw_ts == SUM_ROW_MARKER {
                        continue;
                    }
                    let ts = parse_datetime(raw_ts).ok_or_else(|| {
                        ReadError::format(
                            path,
                            format!("row {rowno}: cannot parse timestamp '{raw_ts}'"),
                        )
                    })?;
                    let wind = parse_number(table.cell(row, 2), false, None)
                        .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                    let solar = parse_number(table.cell(row, 8), false, None)
                        .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                    stamps.push(ts);
                    rows.push(vec![wind, solar]);
                }
                let keys = vec![
                    ColumnKey::new("wind", "SE", "generation", SOURCE, req.url),
                    ColumnKey::new("solar", "SE", "generation", SOURCE, req.url),
                ];
                (keys, stamps, rows)
            }
        };

        // Normaltid is UTC+1 year-round.
        let utc = stamps.into_iter().map(|t| t - Duration::hours(1));
        CanonicalFrame::from_rows(frame_keys, utc.zip(rows).collect())
    }
}
