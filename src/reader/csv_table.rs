// file: src/reader/csv_table.rs
// description: layout-driven csv parsing into time series with quality masking
// reference: https://docs.rs/csv

use crate::error::{DatastoreError, Result};
use crate::models::{Observation, TimeSeries};
use crate::reader::formats::CsvLayout;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::debug;

/// Tokens read as missing values in any value column.
pub const MISSING_TOKENS: &[&str] = &[
    "", "m", "---", "Eqp", "Ssn", "Dis", "Mnt", "***", "ART", "BRT", "ZFL", "NaN", "nan", "NA",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y%m%d %H%M",
    "%Y%m%d%H%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

/// Parses a timestamp with an explicit format, or by trying the common
/// layouts found in agency files.
pub fn parse_timestamp(text: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(format) = format {
        return NaiveDateTime::parse_from_str(text, format).ok();
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if MISSING_TOKENS.contains(&text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Result of parsing one file.
#[derive(Debug)]
pub struct ParsedFile {
    pub series: TimeSeries,
    /// Rows dropped because their timestamp could not be parsed.
    pub bad_timestamps: usize,
}

pub fn read_with_layout(
    path: &Path,
    layout: &CsvLayout,
    selector: Option<&[String]>,
    nrows: Option<usize>,
) -> Result<ParsedFile> {
    let bytes = std::fs::read(path).map_err(|e| DatastoreError::file(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_text(&text, &path.display().to_string(), layout, selector, nrows)
}

pub fn parse_text(
    text: &str,
    file: &str,
    layout: &CsvLayout,
    selector: Option<&[String]>,
    nrows: Option<usize>,
) -> Result<ParsedFile> {
    let body: String = text
        .lines()
        .skip(layout.skip_rows)
        .filter(|line| {
            let comment = layout
                .comment
                .is_some_and(|c| line.as_bytes().first() == Some(&c));
            !comment && !line.trim().is_empty()
        })
        .map(|line| format!("{}\n", line.trim_end_matches('\r')))
        .collect();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut records = reader.records();

    let mut headers: Vec<String> = if layout.has_header {
        match records.next() {
            Some(row) => row?.iter().map(|h| h.trim().to_string()).collect(),
            None => return Err(DatastoreError::format(file, "File has no header row")),
        }
    } else {
        Vec::new()
    };

    if let Some(names) = &layout.column_names {
        for (i, name) in names.iter().enumerate() {
            if i < headers.len() {
                headers[i] = name.clone();
            } else {
                headers.push(name.clone());
            }
        }
    }

    let index_of = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatastoreError::format(file, format!("Column '{}' not found", name)))
    };

    let time_idx: Vec<usize> = if layout.time_columns.is_empty() {
        vec![0]
    } else {
        layout
            .time_columns
            .iter()
            .map(|c| index_of(c))
            .collect::<Result<_>>()?
    };

    let value_names: Vec<String> = match selector {
        Some(selected) if !selected.is_empty() => {
            if !layout.allows_selector {
                return Err(DatastoreError::Validation(
                    "This is not a multivariate format, selector not allowed".to_string(),
                ));
            }
            selected.to_vec()
        }
        _ if !layout.values.is_empty() => layout.values.clone(),
        _ => headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !time_idx.contains(i))
            .map(|(_, h)| h.clone())
            .collect(),
    };

    let value_idx: Vec<usize> = value_names
        .iter()
        .map(|c| index_of(c))
        .collect::<Result<_>>()?;

    let qaqc_idx: Vec<Option<usize>> = value_names
        .iter()
        .enumerate()
        .map(|(i, _)| match layout.qaqc.get(i).cloned().flatten() {
            Some(flag) => index_of(&flag).map(Some),
            None => Ok(None),
        })
        .collect::<Result<_>>()?;

    let accepted = |flag: &str| -> bool {
        let flag = flag.trim();
        (layout.blank_qaqc_good && flag.is_empty()) || layout.accept.iter().any(|a| a == flag)
    };

    let mut rows = Vec::new();
    let mut bad_timestamps = 0;

    for record in records.take(nrows.unwrap_or(usize::MAX)) {
        let record = record?;
        let time_text = time_idx
            .iter()
            .map(|&i| record.get(i).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(layout.time_join);

        let Some(time) = parse_timestamp(&time_text, layout.date_format) else {
            bad_timestamps += 1;
            continue;
        };

        let values = value_idx
            .iter()
            .zip(&qaqc_idx)
            .map(|(&vi, qi)| {
                let value = parse_value(record.get(vi).unwrap_or(""));
                match qi {
                    Some(qi) if !accepted(record.get(*qi).unwrap_or("")) => None,
                    _ => value,
                }
            })
            .collect();

        rows.push(Observation::new(time, values));
    }

    debug!(
        "Parsed {} rows from {} ({} bad timestamps)",
        rows.len(),
        file,
        bad_timestamps
    );

    Ok(ParsedFile {
        series: TimeSeries::from_rows(value_names, rows)?,
        bad_timestamps,
    })
}
