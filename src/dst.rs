//! Local-time to UTC normalization under source-specific DST conventions.
//!
//! European sources disagree on how the doubled hour of the fall-back
//! transition is reported. Each adapter declares one [`DstPolicy`] per
//! source era and may attach a per-row [`DstSide`] hint where the file
//! carries an explicit marker; hints always win for the row that has one.

use chrono::{Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::error::TimestampAmbiguityError;

/// Which of the two occurrences of the doubled local hour a reading
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstSide {
    /// First occurrence, summer offset (earlier UTC instant).
    Summer,
    /// Second occurrence, winter offset (later UTC instant).
    Winter,
}

/// How a source disambiguates the doubled hour of the fall transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Physical row order disambiguates: the first occurrence is summer
    /// time, the second winter time.
    InferFromOrder,
    /// Every occurrence carries a marker; an ambiguous stamp without one
    /// cannot be resolved.
    ExplicitMarker,
    /// Every occurrence is forced to one side, independent of the data.
    FixedAssignment(DstSide),
    /// The source never reports the doubled hour. Its absence stays a
    /// structural gap for the reindexer; seeing it is an error.
    Absent,
}

/// Map local stamps with optional marker hints to UTC instants, one output
/// per input, in input order.
pub fn localize_rows(
    rows: &[(NaiveDateTime, Option<DstSide>)],
    tz: Tz,
    policy: DstPolicy,
) -> Result<Vec<NaiveDateTime>, TimestampAmbiguityError> {
    let mut out = Vec::with_capacity(rows.len());
    let mut last_utc: Option<NaiveDateTime> = None;

    for (row, (local, hint)) in rows.iter().enumerate() {
        let utc = match tz.from_local_datetime(local) {
            LocalResult::Single(dt) => dt.naive_utc(),
            LocalResult::Ambiguous(earliest, latest) => {
                let summer = earliest.naive_utc();
                let winter = latest.naive_utc();
                match hint {
                    Some(DstSide::Summer) => summer,
                    Some(DstSide::Winter) => winter,
                    None => match policy {
                        DstPolicy::FixedAssignment(DstSide::Summer) => summer,
                        DstPolicy::FixedAssignment(DstSide::Winter) => winter,
                        DstPolicy::InferFromOrder => match last_utc {
                            // First pass over the doubled hour extends the
                            // sequence with the summer offset, the second
                            // with the winter offset.
                            Some(last) if summer <= last => {
                                if winter <= last {
                                    return Err(TimestampAmbiguityError::new(
                                        row,
                                        *local,
                                        "repeated local hour cannot be ordered",
                                    ));
                                }
                                winter
                            }
                            _ => summer,
                        },
                        DstPolicy::ExplicitMarker => {
                            return Err(TimestampAmbiguityError::new(
                                row,
                                *local,
                                "ambiguous local time without a marker",
                            ));
                        }
                        DstPolicy::Absent => {
                            return Err(TimestampAmbiguityError::new(
                                row,
                                *local,
                                "source declared not to report the doubled hour",
                            ));
                        }
                    },
                }
            }
            LocalResult::None => {
                return Err(TimestampAmbiguityError::new(
                    row,
                    *local,
                    "local time does not exist (spring transition)",
                ));
            }
        };
        last_utc = Some(utc);
        out.push(utc);
    }
    Ok(out)
}

/// Hint-less convenience over [`localize_rows`].
pub fn localize_series(
    stamps: &[NaiveDateTime],
    tz: Tz,
    policy: DstPolicy,
) -> Result<Vec<NaiveDateTime>, TimestampAmbiguityError> {
    let rows: Vec<(NaiveDateTime, Option<DstSide>)> =
        stamps.iter().map(|t| (*t, None)).collect();
    localize_rows(&rows, tz, policy)
}

/// Local wall-clock starts of the skipped spring hour, one per year in
/// `years` where the zone actually skips it (last Sunday of March, 02:00,
/// for the European zones handled here).
pub fn spring_gap_starts(tz: Tz, years: std::ops::RangeInclusive<i32>) -> Vec<NaiveDateTime> {
    transition_candidates(years, 3)
        .filter(|t| matches!(tz.from_local_datetime(t), LocalResult::None))
        .collect()
}

/// Local wall-clock starts of the doubled fall hour, one per year in
/// `years` where the zone actually doubles it (last Sunday of October,
/// 02:00).
pub fn fall_ambiguous_starts(tz: Tz, years: std::ops::RangeInclusive<i32>) -> Vec<NaiveDateTime> {
    transition_candidates(years, 10)
        .filter(|t| matches!(tz.from_local_datetime(t), LocalResult::Ambiguous(_, _)))
        .collect()
}

/// Merged spring and fall transition starts, sorted; the aggregated-portal
/// row filters key off this combined calendar.
pub fn dst_transition_starts(tz: Tz, years: std::ops::RangeInclusive<i32>) -> Vec<NaiveDateTime> {
    let mut all = spring_gap_starts(tz, years.clone());
    all.extend(fall_ambiguous_starts(tz, years));
    all.sort();
    all
}

/// Year span the historical calendars cover; sources in this corpus start
/// reporting after 2000.
pub const TRANSITION_YEARS: std::ops::RangeInclusive<i32> = 2000..=2030;

fn transition_candidates(
    years: std::ops::RangeInclusive<i32>,
    month: u32,
) -> impl Iterator<Item = NaiveDateTime> {
    years.filter_map(move |year| {
        last_weekday_of_month(year, month, Weekday::Sun)
            .and_then(|d| d.and_hms_opt(2, 0, 0))
    })
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_of_next - Duration::days(1);
    while day.weekday() != weekday {
        day = day - Duration::days(1);
    }
    Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::{Berlin, Brussels};

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn unambiguous_stamps_convert_directly() {
        let utc = localize_series(
            &[local(2015, 6, 1, 12, 0)],
            Berlin,
            DstPolicy::InferFromOrder,
        )
        .unwrap();
        // CEST is UTC+2.
        assert_eq!(utc, vec![local(2015, 6, 1, 10, 0)]);
    }

    #[test]
    fn infer_orders_the_doubled_hour() {
        // Fall-back 2015-10-25: local 02:30 occurs twice.
        let stamps = [
            local(2015, 10, 25, 1, 30),
            local(2015, 10, 25, 2, 30),
            local(2015, 10, 25, 2, 30),
            local(2015, 10, 25, 3, 30),
        ];
        let utc = localize_series(&stamps, Berlin, DstPolicy::InferFromOrder).unwrap();
        assert_eq!(
            utc,
            vec![
                local(2015, 10, 24, 23, 30),
                local(2015, 10, 25, 0, 30), // first pass, CEST (UTC+2)
                local(2015, 10, 25, 1, 30), // second pass, CET (UTC+1)
                local(2015, 10, 25, 2, 30),
            ]
        );
        // No duplicates, strictly increasing.
        for pair in utc.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn fixed_assignment_overrides_order() {
        let stamps = [local(2015, 10, 25, 2, 0), local(2015, 10, 25, 2, 15)];
        let summer = localize_series(
            &stamps,
            Berlin,
            DstPolicy::FixedAssignment(DstSide::Summer),
        )
        .unwrap();
        assert_eq!(summer[0], local(2015, 10, 25, 0, 0));
        let winter = localize_series(
            &stamps,
            Berlin,
            DstPolicy::FixedAssignment(DstSide::Winter),
        )
        .unwrap();
        assert_eq!(winter[0], local(2015, 10, 25, 1, 0));
    }

    #[test]
    fn marker_hint_wins_over_policy() {
        let rows = [
            (local(2015, 10, 25, 2, 0), Some(DstSide::Summer)),
            (local(2015, 10, 25, 2, 0), Some(DstSide::Winter)),
        ];
        let utc = localize_rows(&rows, Brussels, DstPolicy::ExplicitMarker).unwrap();
        assert_eq!(utc[0], local(2015, 10, 25, 0, 0));
        assert_eq!(utc[1], local(2015, 10, 25, 1, 0));
    }

    #[test]
    fn explicit_marker_rejects_unmarked_ambiguity() {
        let err = localize_series(
            &[local(2015, 10, 25, 2, 0)],
            Brussels,
            DstPolicy::ExplicitMarker,
        )
        .unwrap_err();
        assert_eq!(err.row, 0);
    }

    #[test]
    fn absent_policy_rejects_the_doubled_hour() {
        assert!(localize_series(
            &[local(2015, 10, 25, 2, 0)],
            Berlin,
            DstPolicy::Absent
        )
        .is_err());
    }

    #[test]
    fn nonexistent_local_time_is_fatal() {
        // Spring-forward 2015-03-29: local 02:30 never happens.
        let err = localize_series(
            &[local(2015, 3, 29, 2, 30)],
            Berlin,
            DstPolicy::InferFromOrder,
        )
        .unwrap_err();
        assert_eq!(err.local, local(2015, 3, 29, 2, 30));
    }

    #[test]
    fn transition_calendars_match_known_dates() {
        let springs = spring_gap_starts(Berlin, 2014..=2016);
        assert_eq!(
            springs,
            vec![
                local(2014, 3, 30, 2, 0),
                local(2015, 3, 29, 2, 0),
                local(2016, 3, 27, 2, 0),
            ]
        );
        let falls = fall_ambiguous_starts(Berlin, 2015..=2015);
        assert_eq!(falls, vec![local(2015, 10, 25, 2, 0)]);

        let both = dst_transition_starts(Berlin, 2015..=2015);
        assert_eq!(both.len(), 2);
        assert!(both[0] < both[1]);
    }
}
