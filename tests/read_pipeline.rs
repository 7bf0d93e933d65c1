//! End-to-end tests over the on-disk layout
//! `<out_path>/<source>/<series>/<container>/<file>`.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use timeseries_reader::{
    read, read_with_progress, ColumnKey, ColumnKeySchema, ReadError, ReadRequest, ReadWarning,
    Resolution,
};

const CEPS_HEADER: &str =
    "CEPS wind and solar generation export\ncreated 2015\ntimestamp;WPP [MW];PVPP [MW]\n";

fn utc(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn wind_key() -> ColumnKey {
    ColumnKey::new("wind-onshore", "CZ", "generation", "CEPS", "http://ceps.cz")
}

fn write_container(base: &Path, container: &str, filename: &str, rows: &[(&str, i32)]) {
    let dir = base.join("CEPS").join("wind").join(container);
    fs::create_dir_all(&dir).unwrap();
    let mut content = String::from(CEPS_HEADER);
    for (ts, wind) in rows {
        content.push_str(&format!("{ts};{wind};0\n"));
    }
    fs::write(dir.join(filename), content).unwrap();
}

fn request(base: &Path) -> ReadRequest {
    ReadRequest {
        source: "CEPS".to_string(),
        series: "wind".to_string(),
        url: "http://ceps.cz".to_string(),
        resolution: Resolution::Hour,
        schema: ColumnKeySchema::default(),
        out_path: base.to_path_buf(),
        start: None,
        end: None,
    }
}

#[test]
fn merges_left_biased_reindexes_and_reports_progress() {
    let tmp = TempDir::new().unwrap();

    // Earlier container: local 01:00-06:00 CET with 04:00 missing; the
    // overlap hour 06:00 carries the authoritative value.
    write_container(
        tmp.path(),
        "2015-01-01_2015-01-01",
        "ceps_2015_01_01.csv",
        &[
            ("2015-01-01 01:00:00", 10),
            ("2015-01-01 02:00:00", 20),
            ("2015-01-01 03:00:00", 30),
            ("2015-01-01 05:00:00", 50),
            ("2015-01-01 06:00:00", 60),
        ],
    );
    // Later container overlaps at local 06:00 with a conflicting value.
    write_container(
        tmp.path(),
        "2015-01-02_2015-01-02",
        "ceps_2015_01_02.csv",
        &[
            ("2015-01-01 06:00:00", 999),
            ("2015-01-01 07:00:00", 70),
            ("2015-01-01 08:00:00", 80),
        ],
    );

    let mut events = Vec::new();
    let report = read_with_progress(&request(tmp.path()), &mut |p| events.push((p.done, p.total)))
        .unwrap();

    assert_eq!(report.files_total, 2);
    assert_eq!(report.files_read, 2);
    assert!(report.warnings.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(events.first(), Some(&(0, 2)));
    assert_eq!(events.last(), Some(&(2, 2)));

    // Local CET is UTC+1: local 01:00 becomes 00:00 UTC. The reindexed
    // grid runs 00:00..07:00 UTC with the missing local 04:00 exposed.
    let frame = &report.frame;
    assert_eq!(frame.len(), 8);
    assert_eq!(frame.index()[0], utc(2015, 1, 1, 0));
    assert_eq!(frame.index()[7], utc(2015, 1, 1, 7));
    assert_eq!(frame.get(utc(2015, 1, 1, 0), &wind_key()), Some(10.0));
    assert_eq!(frame.get(utc(2015, 1, 1, 3), &wind_key()), None); // gap row
    assert_eq!(frame.get(utc(2015, 1, 1, 5), &wind_key()), Some(60.0)); // A wins
    assert_eq!(frame.get(utc(2015, 1, 1, 7), &wind_key()), Some(80.0));
}

#[test]
fn end_bound_keeps_last_full_period_of_previous_day() {
    let tmp = TempDir::new().unwrap();
    // Local 20:00 Jan 1 .. 05:00 Jan 2, hourly.
    write_container(
        tmp.path(),
        "2015-01-01_2015-01-02",
        "ceps.csv",
        &[
            ("2015-01-01 20:00:00", 1),
            ("2015-01-01 21:00:00", 2),
            ("2015-01-01 22:00:00", 3),
            ("2015-01-01 23:00:00", 4),
            ("2015-01-02 00:00:00", 5),
            ("2015-01-02 01:00:00", 6),
            ("2015-01-02 02:00:00", 7),
            ("2015-01-02 03:00:00", 8),
            ("2015-01-02 04:00:00", 9),
            ("2015-01-02 05:00:00", 10),
        ],
    );

    let mut req = request(tmp.path());
    req.end = Some(NaiveDate::from_ymd_opt(2015, 1, 2).unwrap());
    let report = read(&req).unwrap();

    // End bound 2015-01-02 keeps everything through local 2015-01-01
    // 23:00 = 22:00 UTC, and nothing later.
    let last = report.frame.index()[report.frame.len() - 1];
    assert_eq!(last, utc(2015, 1, 1, 22));
    assert_eq!(report.frame.get(last, &wind_key()), Some(4.0));
}

#[test]
fn containers_outside_the_window_are_skipped() {
    let tmp = TempDir::new().unwrap();
    write_container(
        tmp.path(),
        "2014-01-01_2014-12-31",
        "ceps_2014.csv",
        &[
            ("2014-06-01 01:00:00", 1),
            ("2014-06-01 02:00:00", 2),
            ("2014-06-01 03:00:00", 3),
            ("2014-06-01 04:00:00", 4),
            ("2014-06-01 05:00:00", 5),
        ],
    );

    let mut req = request(tmp.path());
    req.start = Some(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap());
    let report = read(&req).unwrap();

    // Explicitly empty, and the warnings say why: nothing matched.
    assert!(report.frame.is_empty());
    assert_eq!(report.files_read, 0);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, ReadWarning::EmptyResult { .. })));
}

#[test]
fn structural_problems_warn_and_skip() {
    let tmp = TempDir::new().unwrap();

    // Good container.
    write_container(
        tmp.path(),
        "2015-01-01_2015-01-01",
        "good.csv",
        &[
            ("2015-01-01 01:00:00", 10),
            ("2015-01-01 02:00:00", 20),
            ("2015-01-01 03:00:00", 30),
            ("2015-01-01 04:00:00", 40),
            ("2015-01-01 05:00:00", 50),
        ],
    );
    // Container with two files.
    write_container(
        tmp.path(),
        "2015-01-02_2015-01-02",
        "first.csv",
        &[
            ("2015-01-02 01:00:00", 1),
            ("2015-01-02 02:00:00", 2),
            ("2015-01-02 03:00:00", 3),
            ("2015-01-02 04:00:00", 4),
            ("2015-01-02 05:00:00", 5),
        ],
    );
    write_container(
        tmp.path(),
        "2015-01-02_2015-01-02",
        "second.csv",
        &[
            ("2015-01-02 01:00:00", 6),
            ("2015-01-02 02:00:00", 7),
            ("2015-01-02 03:00:00", 8),
            ("2015-01-02 04:00:00", 9),
            ("2015-01-02 05:00:00", 10),
        ],
    );
    // Empty container.
    fs::create_dir_all(
        tmp.path()
            .join("CEPS")
            .join("wind")
            .join("2015-01-03_2015-01-03"),
    )
    .unwrap();
    // Probably-empty file.
    let small_dir = tmp
        .path()
        .join("CEPS")
        .join("wind")
        .join("2015-01-04_2015-01-04");
    fs::create_dir_all(&small_dir).unwrap();
    fs::write(small_dir.join("empty.csv"), "x").unwrap();

    let report = read(&request(tmp.path())).unwrap();

    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, ReadWarning::MultipleFiles { count: 2, .. })));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, ReadWarning::NoFiles { .. })));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, ReadWarning::FileTooSmall { .. })));

    // Only the good container contributed data.
    assert_eq!(report.files_read, 1);
    assert_eq!(report.frame.len(), 5);
    assert_eq!(report.frame.get(utc(2015, 1, 1, 0), &wind_key()), Some(10.0));
}

#[test]
fn format_failures_abort_only_the_affected_file() {
    let tmp = TempDir::new().unwrap();
    write_container(
        tmp.path(),
        "2015-01-01_2015-01-01",
        "good.csv",
        &[
            ("2015-01-01 01:00:00", 10),
            ("2015-01-01 02:00:00", 20),
            ("2015-01-01 03:00:00", 30),
            ("2015-01-01 04:00:00", 40),
            ("2015-01-01 05:00:00", 50),
        ],
    );
    // A file whose header lacks the expected raw columns.
    let bad_dir = tmp
        .path()
        .join("CEPS")
        .join("wind")
        .join("2015-01-02_2015-01-02");
    fs::create_dir_all(&bad_dir).unwrap();
    let mut bad = String::from("CEPS\nexport\ntimestamp;Unexpected [MW]\n");
    for hour in 1..=5 {
        bad.push_str(&format!("2015-01-02 0{hour}:00:00;1\n"));
    }
    fs::write(bad_dir.join("bad.csv"), bad).unwrap();

    let report = read(&request(tmp.path())).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        ReadError::MissingColumn { .. }
    ));
    // The good file still aggregated.
    assert_eq!(report.files_read, 1);
    assert_eq!(report.frame.len(), 5);
}

#[test]
fn missing_series_dir_is_an_explicit_empty() {
    let tmp = TempDir::new().unwrap();
    let report = read(&request(tmp.path())).unwrap();
    assert!(report.frame.is_empty());
    assert_eq!(report.files_total, 0);
    assert!(matches!(
        report.warnings.as_slice(),
        [ReadWarning::MissingSeriesDir { .. }]
    ));
}

#[test]
fn unknown_source_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let mut req = request(tmp.path());
    req.source = "Fingrid".to_string();
    assert!(matches!(read(&req), Err(ReadError::UnknownSource(_))));
}

#[test]
fn unsupported_source_fails_before_touching_files() {
    let tmp = TempDir::new().unwrap();
    let mut req = request(tmp.path());
    req.source = "RTE".to_string();
    assert!(matches!(read(&req), Err(ReadError::UnsupportedSource(_))));
}

#[test]
fn unknown_series_for_a_source_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let mut req = request(tmp.path());
    req.source = "50Hertz".to_string();
    req.series = "hydro".to_string();
    assert!(matches!(read(&req), Err(ReadError::UnknownSeries { .. })));
}

#[test]
fn column_descriptions_feed_the_metadata_seam() {
    let tmp = TempDir::new().unwrap();
    write_container(
        tmp.path(),
        "2015-01-01_2015-01-01",
        "ceps.csv",
        &[
            ("2015-01-01 01:00:00", 10),
            ("2015-01-01 02:00:00", 20),
            ("2015-01-01 03:00:00", 30),
            ("2015-01-01 04:00:00", 40),
            ("2015-01-01 05:00:00", 50),
        ],
    );

    let req = request(tmp.path());
    let report = read(&req).unwrap();
    let descriptions = report.describe_columns(&req.schema);

    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions[0].name, "wind-onshore_CZ_generation");
    assert_eq!(
        descriptions[0].description,
        "Actual wind-onshore generation in Czech Republic in MW"
    );
    assert_eq!(descriptions[1].name, "solar_CZ_generation");
}
