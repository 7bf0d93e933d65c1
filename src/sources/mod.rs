//! Source adapters: one per operator/format family, dispatched by name.
//!
//! Each adapter parses one raw file with format parameters fixed for that
//! source, normalizes its local timestamps to UTC through the DST module
//! and returns a [`CanonicalFrame`] whose columns carry [`ColumnKey`]s.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ReadError;
use crate::frame::{CanonicalFrame, Resolution};

pub mod amprion;
pub mod ceps;
pub mod elia;
pub mod energinet_dk;
pub mod entso_e_portal;
pub mod hertz;
pub mod opsd;
pub mod pse;
pub mod rte;
pub mod svenska_kraftnaet;
pub mod tennet;
pub mod transnetbw;

/// Per-invocation context handed to an adapter.
#[derive(Debug, Clone, Copy)]
pub struct AdaptRequest<'a> {
    /// Logical series id, e.g. `wind` or `wind_generation_with-offshore`.
    pub series: &'a str,
    /// Source URL recorded in every produced column key.
    pub url: &'a str,
    /// Declared resolution of the series; the daily-capacity adapter
    /// resamples onto this grid.
    pub resolution: Resolution,
}

/// A parser for one source's file format family.
pub trait SourceAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Cheap configuration check run before any file is touched; a series
    /// the source cannot provide is a configuration error, not a data
    /// error.
    fn validate(&self, _series: &str) -> Result<(), ReadError> {
        Ok(())
    }

    fn adapt(&self, path: &Path, req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError>;
}

/// Resolve a source name to its adapter. This is the single dispatch seam
/// the rest of the pipeline depends on.
pub fn adapter_for(source: &str) -> Option<Box<dyn SourceAdapter>> {
    match source {
        "OPSD" => Some(Box::new(opsd::Opsd)),
        "CEPS" => Some(Box::new(ceps::Ceps)),
        "ENTSO-E Data Portal" => Some(Box::new(entso_e_portal::EntsoEPortal)),
        "Energinet.dk" => Some(Box::new(energinet_dk::EnerginetDk)),
        "Elia" => Some(Box::new(elia::Elia)),
        "PSE" => Some(Box::new(pse::Pse)),
        "RTE" => Some(Box::new(rte::Rte)),
        "Svenska Kraftnaet" => Some(Box::new(svenska_kraftnaet::SvenskaKraftnaet)),
        "50Hertz" => Some(Box::new(hertz::Hertz)),
        "Amprion" => Some(Box::new(amprion::Amprion)),
        "TenneT" => Some(Box::new(tennet::Tennet)),
        "TransnetBW" => Some(Box::new(transnetbw::TransnetBw)),
        _ => None,
    }
}

/// Text encoding of a raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEncoding {
    Utf8,
    Cp1250,
    Latin1,
}

/// Format parameters fixed per source: delimiter, rows to skip before the
/// table starts, whether the table leads with a header row, and encoding.
#[derive(Debug, Clone, Copy)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub skip_rows: usize,
    pub has_header: bool,
    pub encoding: FileEncoding,
}

impl CsvFormat {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            skip_rows: 0,
            has_header: true,
            encoding: FileEncoding::Utf8,
        }
    }

    pub fn skip_rows(mut self, n: usize) -> Self {
        self.skip_rows = n;
        self
    }

    pub fn headerless(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn encoding(mut self, enc: FileEncoding) -> Self {
        self.encoding = enc;
        self
    }
}

/// A decoded, delimited raw table. Header is empty for headerless formats.
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of a named raw column; absence is fatal for the file.
    pub fn column_index(&self, path: &Path, name: &str) -> Result<usize, ReadError> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ReadError::missing_column(path, name))
    }

    pub fn cell<'a>(&'a self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(|s| s.trim()).unwrap_or("")
    }
}

/// Read and decode a raw file into records. Rows shorter than the widest
/// record are tolerated; adapters index defensively via [`RawTable::cell`].
pub fn read_raw(path: &Path, format: CsvFormat) -> Result<RawTable, ReadError> {
    let bytes = std::fs::read(path)?;
    let text: String = match format.encoding {
        FileEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
        FileEncoding::Cp1250 => encoding_rs::WINDOWS_1250.decode(&bytes).0.into_owned(),
        FileEncoding::Latin1 => encoding_rs::WINDOWS_1252.decode(&bytes).0.into_owned(),
    };

    let mut remaining = text.as_str();
    for _ in 0..format.skip_rows {
        match remaining.find('\n') {
            Some(pos) => remaining = &remaining[pos + 1..],
            None => {
                return Err(ReadError::format(
                    path,
                    format!("file ends before the {} skipped rows", format.skip_rows),
                ))
            }
        }
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(format.has_header)
        .flexible(true)
        .from_reader(remaining.as_bytes());

    let headers = if format.has_header {
        reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(RawTable { headers, rows })
}

/// Values a source uses to mark a missing observation.
const NA_MARKERS: [&str; 6] = ["", "n.a.", "N/A", "NA", "n/a", "-"];

/// Parse one numeric cell. Recognized missing markers become `None`;
/// anything else must parse, so silent coercion cannot hide format drift.
pub fn parse_number(
    raw: &str,
    decimal_comma: bool,
    thousands: Option<char>,
) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if NA_MARKERS.contains(&trimmed) {
        return Ok(None);
    }
    let mut cleaned = trimmed.to_string();
    if let Some(sep) = thousands {
        cleaned = cleaned.replace(sep, "");
    }
    if decimal_comma {
        cleaned = cleaned.replace(',', ".");
    }
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("cannot parse number '{raw}'"))
}

/// Parse a date cell. Accepts ISO dates, compact `YYYYMMDD` and, depending
/// on `dayfirst`, `DD.MM.YYYY` / `DD/MM/YYYY` or `MM/DD/YYYY`.
pub fn parse_date(raw: &str, dayfirst: bool) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d") {
        return Some(d);
    }
    if dayfirst {
        NaiveDate::parse_from_str(s, "%d.%m.%Y")
            .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
            .ok()
    } else {
        NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
    }
}

/// Parse a wall-clock cell, truncating to `HH:MM` the way several TSO
/// exports append seconds or suffixes.
pub fn parse_time_hm(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    let truncated = s.get(..5).unwrap_or(s);
    NaiveTime::parse_from_str(truncated, "%H:%M").ok()
}

/// Parse a full local timestamp: ISO with or without seconds, then the
/// dayfirst forms used by spreadsheet exports.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
    ] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    None
}
