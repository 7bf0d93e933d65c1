//! 50Hertz (German TSO): quarter-hourly wind and solar series.
//!
//! The column subset depends on the logical series: since 2016 wind files
//! carry an extra onshore/offshore split. Reporting of the fall-back hour
//! also changed over the years, so the DST policy is era-conditional.

use std::path::Path;

use chrono::Datelike;
use chrono_tz::Europe::Berlin;

use super::{parse_date, parse_number, parse_time_hm, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::dst::{localize_series, DstPolicy, DstSide};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const COL_DATE: usize = 0;
const COL_TIME: usize = 1;
const SKIP_ROWS: usize = 3;

pub struct Hertz;

impl Hertz {
    /// Value column positions and the variables they map to, derived from
    /// the logical series id (`<tech>_<attribute>[_<phase>]`).
    fn layout(
        series: &str,
        url: &str,
    ) -> Option<(Vec<usize>, Vec<ColumnKey>)> {
        let parts: Vec<&str> = series.split('_').collect();
        match parts.as_slice() {
            ["wind", attribute, phase] => {
                if *phase == "with-offshore" {
                    Some((
                        vec![3, 4, 5],
                        vec![
                            ColumnKey::new("wind", "DE-50hertz", *attribute, "50Hertz", url),
                            ColumnKey::new("wind-onshore", "DE-50hertz", *attribute, "50Hertz", url),
                            ColumnKey::new("wind-offshore", "DE-50hertz", *attribute, "50Hertz", url),
                        ],
                    ))
                } else {
                    Some((
                        vec![3],
                        vec![ColumnKey::new("wind", "DE-50hertz", *attribute, "50Hertz", url)],
                    ))
                }
            }
            ["solar", attribute] => Some((
                vec![3],
                vec![ColumnKey::new("solar", "DE-50hertz", *attribute, "50Hertz", url)],
            )),
            _ => None,
        }
    }

    /// Between 2007 and 2014 (and in 2015 for the pre-offshore wind
    /// series) both occurrences of the doubled hour are present in
    /// recording order; in all other years only the wintertime one is
    /// reported.
    fn policy_for(first_year: i32, series: &str) -> DstPolicy {
        if (2006 < first_year && first_year < 2015)
            || (series == "wind_generation_pre-offshore" && first_year == 2015)
        {
            DstPolicy::InferFromOrder
        } else {
            DstPolicy::FixedAssignment(DstSide::Winter)
        }
    }
}

impl SourceAdapter for Hertz {
    fn source_name(&self) -> &'static str {
        "50Hertz"
    }

    fn validate(&self, series: &str) -> Result<(), ReadError> {
        match Self::layout(series, "") {
            Some(_) => Ok(()),
            None => Err(ReadError::UnknownSeries {
                source_name: "50Hertz".to_string(),
                series: series.to_string(),
            }),
        }
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let (value_cols, keys) =
            Self::layout(req.series, req.url).ok_or_else(|| ReadError::UnknownSeries {
                source_name: "50Hertz".to_string(),
                series: req.series.to_string(),
            })?;

        let table = read_raw(path, CsvFormat::new(b';').skip_rows(SKIP_ROWS))?;

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
            let mut values = Vec::with_capacity(value_cols.len());
            for &idx in &value_cols {
                let value = parse_number(table.cell(row, idx), true, Some('.'))
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                values.push(value);
            }
            stamps.push(date.and_time(time));
            rows.push(values);
        }

        let policy = match stamps.first() {
            Some(first) => Self::policy_for(first.year(), req.series),
            None => DstPolicy::InferFromOrder,
        };
        let utc = localize_series(&stamps, Berlin, policy)?;
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(rows).collect())
    }
}
