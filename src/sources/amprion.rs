//! Amprion (German TSO): quarter-hourly forecast and generation.
//!
//! Reporting of the fall-back hour changed after 2009: earlier files carry
//! both occurrences in recording order, later files only the summertime
//! one. The era split is applied within a single file.

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
const VALUE_COLS: [(usize, &str); 2] = [(2, "forecast"), (3, "generation")];

/// Last year in which both occurrences of the doubled hour were reported.
const INFER_ERA_LAST_YEAR: i32 = 2009;

pub struct Amprion;

impl SourceAdapter for Amprion {
    fn source_name(&self) -> &'static str {
        "Amprion"
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

        // Rows arrive in chronological order; the era boundary is a single
        // split point.
        let split = stamps
            .iter()
            .position(|t| t.year() > INFER_ERA_LAST_YEAR)
            .unwrap_or(stamps.len());
        let mut utc = localize_series(&stamps[..split], Berlin, DstPolicy::InferFromOrder)?;
        utc.extend(localize_series(
            &stamps[split..],
            Berlin,
            DstPolicy::FixedAssignment(DstSide::Summer),
        )?);

        let keys = VALUE_COLS
            .iter()
            .map(|(_, attribute)| {
                ColumnKey::new(req.series, "DE-amprion", *attribute, "Amprion", req.url)
            })
            .collect();
        CanonicalFrame::from_rows(keys, utc.into_iter().zip(rows).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Resolution;
    use std::io::Write;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn post_2009_doubled_hour_is_summertime() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Fall-back day 2015-10-25: only the summertime occurrence exists.
        write!(
            file,
            "Datum;Uhrzeit;8:00 Uhr Prognose [MW];Online Hochrechnung [MW]\n\
             25.10.2015;01:45;1,0;2,0\n\
             25.10.2015;02:00;1,1;2,1\n\
             25.10.2015;02:15;1,2;2,2\n"
        )
        .unwrap();

        let req = AdaptRequest {
            series: "wind",
            url: "http://amprion.net",
            resolution: Resolution::QuarterHour,
        };
        let frame = Amprion.adapt(file.path(), &req).unwrap();
        let generation =
            ColumnKey::new("wind", "DE-amprion", "generation", "Amprion", "http://amprion.net");
        // 02:00 CEST = 00:00 UTC.
        assert_eq!(frame.get(utc(2015, 10, 25, 0, 0), &generation), Some(2.1));
    }

    #[test]
    fn pre_2010_doubled_hour_resolves_by_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Fall-back day 2009-10-25: both occurrences, recording order.
        write!(
            file,
            "Datum;Uhrzeit;8:00 Uhr Prognose [MW];Online Hochrechnung [MW]\n\
             25.10.2009;02:00;1,0;2,0\n\
             25.10.2009;02:00;1,1;2,1\n"
        )
        .unwrap();

        let req = AdaptRequest {
            series: "wind",
            url: "u",
            resolution: Resolution::QuarterHour,
        };
        let frame = Amprion.adapt(file.path(), &req).unwrap();
        let generation = ColumnKey::new("wind", "DE-amprion", "generation", "Amprion", "u");
        assert_eq!(frame.get(utc(2009, 10, 25, 0, 0), &generation), Some(2.0));
        assert_eq!(frame.get(utc(2009, 10, 25, 1, 0), &generation), Some(2.1));
    }
}
