//! ENTSO-E Data Portal: hourly load for many countries, published as a
//! days-as-rows / hours-as-columns table that is reshaped to
//! timestamps-as-rows here.
//!
//! Hour columns are 1-based and name the interval end. October files
//! replace the third hour with `3A`/`3B` columns: at face value the labels
//! name hour 3, but they denote the first and second occurrence of local
//! 02:00. `3B` carries data only on the actual fall-transition day and is
//! dropped everywhere else; a plain `03` column is dropped on transition
//! days.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use chrono_tz::Europe::Brussels;
use regex::Regex;

use super::{parse_date, parse_number, read_raw, AdaptRequest, CsvFormat, SourceAdapter};
use crate::dst::{dst_transition_starts, localize_rows, DstPolicy, DstSide, TRANSITION_YEARS};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;
use crate::keys::ColumnKey;

const COL_COUNTRY: usize = 0;
const COL_DAY: usize = 1;
const SKIP_ROWS: usize = 9;
const SOURCE: &str = "ENTSO-E Data Portal";

/// Sort rank so that within one instant the summer occurrence precedes the
/// winter one.
fn rank(marker: Option<DstSide>) -> u8 {
    match marker {
        Some(DstSide::Summer) => 0,
        None => 1,
        Some(DstSide::Winter) => 2,
    }
}

fn rename_region(raw: &str) -> String {
    match raw {
        "DK_W" => "DK-west".to_string(),
        "UA_W" => "UA-west".to_string(),
        other => other.to_string(),
    }
}

struct HourColumn {
    idx: usize,
    /// 1-based end label; the interval starts one hour earlier.
    hour: i64,
    marker: Option<DstSide>,
}

pub struct EntsoEPortal;

impl SourceAdapter for EntsoEPortal {
    fn source_name(&self) -> &'static str {
        SOURCE
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        let table = read_raw(path, CsvFormat::new(b';').skip_rows(SKIP_ROWS))?;
        if table.headers.len() < 3 {
            return Err(ReadError::format(path, "expected country, day and hour columns"));
        }

        let label = Regex::new(r"^0?(\d{1,2})([AB])?:00(:00)?$").unwrap();
        let mut hour_cols = Vec::new();
        for (idx, header) in table.headers.iter().enumerate().skip(2) {
            let caps = label.captures(header.trim()).ok_or_else(|| {
                ReadError::format(path, format!("unexpected hour column '{header}'"))
            })?;
            let hour: i64 = caps[1].parse().map_err(|_| {
                ReadError::format(path, format!("unexpected hour column '{header}'"))
            })?;
            let marker = match caps.get(2).map(|m| m.as_str()) {
                Some("A") => Some(DstSide::Summer),
                Some("B") => Some(DstSide::Winter),
                _ => None,
            };
            hour_cols.push(HourColumn { idx, hour, marker });
        }

        let transitions = dst_transition_starts(Brussels, TRANSITION_YEARS);

        // Reshape: one record per (day, hour, country) cell, collected per
        // stamp; regions are sorted for a stable column order.
        let mut regions: Vec<String> = Vec::new();
        let mut cells: BTreeMap<(NaiveDateTime, u8), Vec<(usize, f64)>> = BTreeMap::new();
        let mut markers: BTreeMap<(NaiveDateTime, u8), Option<DstSide>> = BTreeMap::new();

        for (rowno, row) in table.rows.iter().enumerate() {
            let raw_country = table.cell(row, COL_COUNTRY);
            if raw_country.is_empty() {
                continue;
            }
            let region = rename_region(raw_country);
            let region_idx = match regions.iter().position(|r| r == &region) {
                Some(i) => i,
                None => {
                    regions.push(region.clone());
                    regions.len() - 1
                }
            };
            let raw_day = table.cell(row, COL_DAY);
            let day = parse_date(raw_day, false)
                .or_else(|| parse_date(raw_day, true))
                .ok_or_else(|| {
                    ReadError::format(path, format!("row {rowno}: cannot parse day '{raw_day}'"))
                })?;

            for col in &hour_cols {
                let value = parse_number(table.cell(row, col.idx), false, None)
                    .map_err(|e| ReadError::format(path, format!("row {rowno}: {e}")))?;
                let Some(value) = value else { continue };

                let ts = day.and_time(chrono::NaiveTime::MIN) + Duration::hours(col.hour - 1);

                // The second-occurrence column only carries real data on
                // the transition day itself.
                if col.marker == Some(DstSide::Winter) && !transitions.contains(&ts) {
                    continue;
                }
                // A plain third hour is dropped on transition days: in
                // spring it does not exist, in fall it is unattributable.
                if col.marker.is_none() && transitions.contains(&ts) {
                    continue;
                }

                let slot = (ts, rank(col.marker));
                cells.entry(slot).or_default().push((region_idx, value));
                markers.insert(slot, col.marker);
            }
        }

        let stamp_rows: Vec<(NaiveDateTime, Option<DstSide>)> = markers
            .iter()
            .map(|(&(ts, _), &marker)| (ts, marker))
            .collect();
        let utc = localize_rows(&stamp_rows, Brussels, DstPolicy::ExplicitMarker)?;

        let mut rows = Vec::with_capacity(utc.len());
        for (u, (slot, _)) in utc.into_iter().zip(markers.iter()) {
            let mut values: Vec<Option<f64>> = vec![None; regions.len()];
            if let Some(found) = cells.get(slot) {
                for &(region_idx, value) in found {
                    values[region_idx] = Some(value);
                }
            }
            rows.push((u, values));
        }

        // Column order follows sorted region codes, as the reshaped table
        // is published.
        let mut order: Vec<usize> = (0..regions.len()).collect();
        order.sort_by(|&a, &b| regions[a].cmp(&regions[b]));
        let keys = order
            .iter()
            .map(|&i| ColumnKey::new("load", regions[i].clone(), "load", SOURCE, req.url))
            .collect();
        let rows = rows
            .into_iter()
            .map(|(ts, values)| {
                let reordered = order.iter().map(|&i| values[i]).collect();
                (ts, reordered)
            })
            .collect();

        CanonicalFrame::from_rows(keys, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Resolution;
    use std::io::Write;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn request() -> AdaptRequest<'static> {
        AdaptRequest {
            series: "load",
            url: "http://entsoe.eu",
            resolution: Resolution::Hour,
        }
    }

    fn preamble() -> String {
        // Nine banner rows precede the header in the published sheets.
        "ENTSO-E\n\n\n\n\n\n\n\n\n".to_string()
    }

    #[test]
    fn october_table_reshapes_and_splits_the_doubled_hour() {
        let mut content = preamble();
        content.push_str("Country;Day;01:00:00;02:00:00;3A:00:00;3B:00:00;04:00:00\n");
        // Regular day: 3B is junk and must be dropped.
        content.push_str("AT;2015-10-24;6000;5900;5800;999;5700\n");
        // Transition day: 3A and 3B are the two occurrences of 02:00.
        content.push_str("AT;2015-10-25;6100;6000;5900;5850;5800\n");
        content.push_str("DK_W;2015-10-25;2100;2000;1900;1850;1800\n");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let frame = EntsoEPortal.adapt(file.path(), &request()).unwrap();

        let at = ColumnKey::new("load", "AT", "load", SOURCE, "http://entsoe.eu");
        let dk = ColumnKey::new("load", "DK-west", "load", SOURCE, "http://entsoe.eu");

        // Regular day, hour 3 = local 02:00 CEST = 00:00 UTC; the junk 3B
        // cell is gone and hour 4 (local 03:00 CEST = 01:00 UTC) keeps its
        // own value.
        assert_eq!(frame.get(utc(2015, 10, 24, 0), &at), Some(5800.0));
        assert_eq!(frame.get(utc(2015, 10, 24, 1), &at), Some(5700.0));

        // Transition day: 3A is CEST (00:00 UTC), 3B is CET (01:00 UTC).
        assert_eq!(frame.get(utc(2015, 10, 25, 0), &at), Some(5900.0));
        assert_eq!(frame.get(utc(2015, 10, 25, 1), &at), Some(5850.0));
        assert_eq!(frame.get(utc(2015, 10, 25, 0), &dk), Some(1900.0));
        assert_eq!(frame.get(utc(2015, 10, 25, 1), &dk), Some(1850.0));
        // Hour 4 = local 03:00 CET = 02:00 UTC.
        assert_eq!(frame.get(utc(2015, 10, 25, 2), &at), Some(5800.0));

        // Countries are columns, sorted by code.
        let regions: Vec<_> = frame.column_keys().map(|k| k.region.clone()).collect();
        assert_eq!(regions, vec!["AT", "DK-west"]);
    }

    #[test]
    fn spring_table_drops_the_phantom_third_hour() {
        let mut content = preamble();
        content.push_str("Country;Day;01:00:00;02:00:00;03:00:00;04:00:00\n");
        content.push_str("AT;2015-03-29;6000;5900;5800;5700\n");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let frame = EntsoEPortal.adapt(file.path(), &request()).unwrap();
        let at = ColumnKey::new("load", "AT", "load", SOURCE, "http://entsoe.eu");

        // Hours 1, 2 are CET; the skipped local 02:00 row is gone; hour 4
        // = local 03:00 CEST = 01:00 UTC.
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.get(utc(2015, 3, 28, 23), &at), Some(6000.0));
        assert_eq!(frame.get(utc(2015, 3, 29, 0), &at), Some(5900.0));
        assert_eq!(frame.get(utc(2015, 3, 29, 1), &at), Some(5700.0));
    }

    #[test]
    fn missing_cells_are_absent_not_invented() {
        let mut content = preamble();
        content.push_str("Country;Day;01:00:00;02:00:00\n");
        content.push_str("AT;2015-06-01;n.a.;5900\n");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let frame = EntsoEPortal.adapt(file.path(), &request()).unwrap();
        // Only the 02:00-labeled hour survives.
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.index()[0], utc(2015, 5, 31, 23));
    }
}
