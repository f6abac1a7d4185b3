// file: src/reader/read_ts.rs
// description: format-detecting time series reader over file patterns
// reference: https://docs.rs/csv

use crate::config::ReaderConfig;
use crate::error::{DatastoreError, Result};
use crate::models::{Frequency, TimeSeries};
use crate::reader::csv_table::read_with_layout;
use crate::reader::formats::{TsFormat, READER_ORDER};
use crate::reader::freq::infer_freq_robust;
use crate::reader::header::read_yaml_header;
use crate::repository::filename::extract_year_fname;
use crate::repository::scanner::expand_pattern;
use chrono::{Datelike, NaiveDateTime};
use std::path::PathBuf;
use tracing::{debug, info};
use yaml_rust::Yaml;

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Round onto an inferred regular grid, keeping the first row per stamp.
    pub force_regular: bool,
    /// Row limit applied to each file.
    pub nrows: Option<usize>,
    pub selector: Option<Vec<String>>,
    /// Substring of a format name, such as `cdec` or `dms1`, restricting
    /// which formats are tried.
    pub hint: Option<String>,
    pub preferred: Vec<Frequency>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            force_regular: true,
            nrows: None,
            selector: None,
            hint: None,
            preferred: default_preferred(),
        }
    }
}

impl ReadOptions {
    pub fn from_config(config: &ReaderConfig) -> Result<Self> {
        Ok(Self {
            preferred: config.preferred_frequencies()?,
            ..Self::default()
        })
    }
}

fn default_preferred() -> Vec<Frequency> {
    vec![
        Frequency::hours(1),
        Frequency::minutes(15),
        Frequency::minutes(6),
        Frequency::minutes(10),
        Frequency::days(1),
    ]
}

fn matches_or_not_found(pattern: &str) -> Result<Vec<PathBuf>> {
    let matches = expand_pattern(pattern)?;
    if matches.is_empty() {
        return Err(DatastoreError::NotFound {
            kind: "file matching pattern",
            name: pattern.to_string(),
        });
    }
    Ok(matches)
}

/// Reads every file matching `pattern` with the first compatible format.
pub fn read_ts(pattern: &str, options: &ReadOptions) -> Result<TimeSeries> {
    let matches = matches_or_not_found(pattern)?;
    let mut last_tried: Option<TsFormat> = None;

    for format in READER_ORDER {
        if let Some(hint) = &options.hint
            && !format.name().contains(hint.as_str())
        {
            continue;
        }
        last_tried = Some(*format);

        if !format.is_compatible(&matches[0])? {
            continue;
        }

        debug!("Reading {} with {}", pattern, format);
        return read_with_format(&matches, *format, options);
    }

    let last = match last_tried {
        Some(TsFormat::LastResortCsv) => {
            format!("{} (last in the list, may not be meaningful)", TsFormat::LastResortCsv)
        }
        Some(format) => format.to_string(),
        None => "none".to_string(),
    };
    Err(DatastoreError::format(
        pattern,
        format!("Format not supported. Last reader tried = {}", last),
    ))
}

/// Reads `files` with one format. Lexically later files are treated as
/// newer and win where files overlap.
pub fn read_with_format(
    files: &[PathBuf],
    format: TsFormat,
    options: &ReadOptions,
) -> Result<TimeSeries> {
    let Some(first) = files.first() else {
        return Err(DatastoreError::Validation("No files to read".to_string()));
    };
    let layout = format.layout(first)?;

    let mut parts = Vec::with_capacity(files.len());
    let mut bad_timestamps = 0;

    for file in files.iter().rev() {
        let parsed = read_with_layout(file, &layout, options.selector.as_deref(), options.nrows)?;
        bad_timestamps += parsed.bad_timestamps;
        parts.push(parsed.series);
    }

    if bad_timestamps > 1 {
        return Err(DatastoreError::format(
            first.display().to_string(),
            format!("Multiple unparseable timestamps found in index ({})", bad_timestamps),
        ));
    }

    let mut merged = TimeSeries::merge(&parts)?;

    if options.force_regular && merged.len() > 1 {
        let freq = infer_freq_robust(&merged.times(), &options.preferred)?.ok_or_else(|| {
            DatastoreError::Validation(format!(
                "Regular series requested but no frequency found for {}",
                first.display()
            ))
        })?;
        merged = merged.regularize(freq);
    }

    Ok(merged.slice(options.start, options.end))
}

/// Year-sharded dms1 data with the `user_flag` column applied as a mask.
///
/// Shards are chosen by the year in their file name. Returns the YAML
/// header of the first selected shard along with the data.
pub fn read_flagged(
    pattern: &str,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    apply_flags: bool,
    return_flags: bool,
) -> Result<(Yaml, TimeSeries)> {
    let start_year = start.map(|s| s.year()).unwrap_or(-9999);
    let end_year = end.map(|e| e.year()).unwrap_or(9999);

    let mut shards = Vec::new();
    for path in matches_or_not_found(pattern)? {
        let year = extract_year_fname(&path.to_string_lossy())?;
        if (start_year..=end_year).contains(&year) {
            shards.push(path);
        }
    }

    let Some(first) = shards.first() else {
        return Err(DatastoreError::NotFound {
            kind: "shard in requested years",
            name: pattern.to_string(),
        });
    };
    let meta = read_yaml_header(first)?;

    let columns = vec!["value".to_string(), "user_flag".to_string()];
    let layout = TsFormat::Dms1.layout(first)?;
    let mut data = TimeSeries::new(columns.clone());
    for shard in &shards {
        let parsed = read_with_layout(shard, &layout, Some(&columns), None)?;
        data.concat(parsed.series)?;
    }

    if apply_flags {
        data.mask_rows(&[1], |row| row.values[1] == Some(1.0));
    }
    if !return_flags {
        data.drop_column("user_flag");
    }

    info!("Read {} rows from {} shards", data.len(), shards.len());
    Ok((meta, data.slice(start, end)))
}
