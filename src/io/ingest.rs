//! CSV ingest for observation series.
//!
//! Turns a loosely formatted export (one row per day or event) into a clean list
//! of `(date, value)` observations.
//!
//! Design goals:
//! - **Strict schema** for the two required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **No hidden coercion**: the "first two columns" fallback must be requested
//!   explicitly

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::Observation;
use crate::error::ImpactError;

/// Header names recognized as the date column, in priority order.
pub const DATE_COLUMNS: [&str; 3] = ["date", "day", "ds"];
/// Header names recognized as the value column, in priority order.
pub const VALUE_COLUMNS: [&str; 5] = ["value", "quantity", "qty", "count", "y"];

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit date column name (case-insensitive).
    pub date_column: Option<String>,
    /// Explicit value column name (case-insensitive).
    pub value_column: Option<String>,
    /// Fall back to columns 1 and 2 when no named columns match.
    pub positional_columns: bool,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Resolved `(date, value)` column indices.
    pub columns: (usize, usize),
}

/// Load observations from a CSV file.
pub fn load_observations(path: &Path, options: &LoadOptions) -> Result<LoadedSeries, ImpactError> {
    let file = File::open(path)
        .map_err(|e| ImpactError::data(format!("failed to open CSV '{}': {e}", path.display())))?;
    let loaded = read_observations(file, options)
        .map_err(|e| match e {
            ImpactError::Data(msg) => ImpactError::Data(format!("{}: {msg}", path.display())),
            other => other,
        })?;
    info!(
        path = %path.display(),
        rows = loaded.rows_read,
        used = loaded.observations.len(),
        errors = loaded.row_errors.len(),
        "loaded series"
    );
    Ok(loaded)
}

/// Read observations from any CSV source with a header row.
pub fn read_observations<R: Read>(source: R, options: &LoadOptions) -> Result<LoadedSeries, ImpactError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| ImpactError::data(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let columns = resolve_columns(&header_map, headers.len(), options)?;
    debug!(?columns, "resolved date/value columns");

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        match parse_row(&record, columns) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if observations.is_empty() {
        let detail = row_errors
            .first()
            .map(|e| format!(" (line {}: {})", e.line, e.message))
            .unwrap_or_default();
        return Err(ImpactError::data(format!("no valid rows{detail}")));
    }

    Ok(LoadedSeries {
        observations,
        row_errors,
        rows_read,
        columns,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, explicit: Option<&str>, candidates: &[&str]) -> Option<usize> {
    match explicit {
        Some(name) => header_map.get(&normalize_header_name(name)).copied(),
        None => candidates.iter().find_map(|c| header_map.get(*c).copied()),
    }
}

fn resolve_columns(
    header_map: &HashMap<String, usize>,
    width: usize,
    options: &LoadOptions,
) -> Result<(usize, usize), ImpactError> {
    let date = find_column(header_map, options.date_column.as_deref(), &DATE_COLUMNS);
    let value = find_column(header_map, options.value_column.as_deref(), &VALUE_COLUMNS);

    if let Some(name) = options.date_column.as_deref().filter(|_| date.is_none()) {
        return Err(ImpactError::data(format!("date column `{name}` not found")));
    }
    if let Some(name) = options.value_column.as_deref().filter(|_| value.is_none()) {
        return Err(ImpactError::data(format!("value column `{name}` not found")));
    }

    match (date, value) {
        (Some(d), Some(v)) => Ok((d, v)),
        _ if options.positional_columns && width >= 2 => {
            warn!("named date/value columns not found, using the first two columns");
            Ok((0, 1))
        }
        _ => Err(ImpactError::data(format!(
            "missing required columns: expected a date column ({}) and a value column ({}); \
             pass --positional-columns to use the first two columns",
            DATE_COLUMNS.join("/"),
            VALUE_COLUMNS.join("/")
        ))),
    }
}

fn parse_row(record: &StringRecord, (date_idx, value_idx): (usize, usize)) -> Result<Observation, String> {
    let raw_date = get_required(record, date_idx, "date")?;
    let raw_value = get_required(record, value_idx, "value")?;
    let date = parse_date(raw_date)?;
    let value = parse_value(raw_value).ok_or_else(|| format!("invalid value '{raw_value}'"))?;
    Ok(Observation::new(date, value))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {name}"))
}

/// Parse `YYYYMMDD`, `YYYY-MM-DD` or `YYYY/MM/DD`, ignoring a trailing time part.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    let day_part = s.split(['T', ' ']).next().unwrap_or(s);
    if day_part.len() == 8 && day_part.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(day_part, "%Y%m%d")
            .map_err(|_| format!("invalid date '{s}'"));
    }
    const FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(day_part, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "invalid date '{s}'. Expected one of: YYYYMMDD, YYYY-MM-DD, YYYY/MM/DD."
    ))
}

fn parse_value(s: &str) -> Option<f64> {
    let v = s.replace(',', "").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn reads_named_columns_and_collects_row_errors() {
        let csv = "\u{feff}Store,Date,Quantity\nA,20170403,29\nA,2017-04-25,24\nA,bad,3\nA,2017/05/23,\"1,024\"\n";
        let loaded = read_observations(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(loaded.columns, (1, 2));
        assert_eq!(loaded.rows_read, 4);
        assert_eq!(
            loaded.observations,
            vec![
                Observation::new(d(2017, 4, 3), 29.0),
                Observation::new(d(2017, 4, 25), 24.0),
                Observation::new(d(2017, 5, 23), 1024.0),
            ]
        );
        assert_eq!(loaded.row_errors.len(), 1);
        assert_eq!(loaded.row_errors[0].line, 4);
    }

    #[test]
    fn unnamed_columns_require_positional_flag() {
        let csv = "when,amount\n2020-01-01,5\n";
        let err = read_observations(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ImpactError::Data(_)));
        assert!(err.to_string().contains("--positional-columns"));

        let opts = LoadOptions {
            positional_columns: true,
            ..LoadOptions::default()
        };
        let loaded = read_observations(csv.as_bytes(), &opts).unwrap();
        assert_eq!(loaded.observations, vec![Observation::new(d(2020, 1, 1), 5.0)]);
    }

    #[test]
    fn explicit_column_names_win() {
        let csv = "date,value,sold\n2020-01-01,1,7\n";
        let opts = LoadOptions {
            value_column: Some("SOLD".to_string()),
            ..LoadOptions::default()
        };
        let loaded = read_observations(csv.as_bytes(), &opts).unwrap();
        assert_eq!(loaded.observations[0].value, 7.0);

        let opts = LoadOptions {
            date_column: Some("missing".to_string()),
            ..LoadOptions::default()
        };
        assert!(read_observations(csv.as_bytes(), &opts).is_err());
    }

    #[test]
    fn all_rows_invalid_is_data_error() {
        let csv = "date,value\nnope,1\n2020-01-01,x\n";
        let err = read_observations(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("20170403").unwrap(), d(2017, 4, 3));
        assert_eq!(parse_date("2017-04-03T00:00:00").unwrap(), d(2017, 4, 3));
        assert_eq!(parse_date("2017-04-03 12:00").unwrap(), d(2017, 4, 3));
        assert!(parse_date("20171340").is_err());
        assert!(parse_date("03/04/2017").is_err());
    }
}
