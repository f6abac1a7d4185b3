// file: src/store/writer.rs
// description: dwr-dms-1.0 csv writer with yaml comment header
// reference: https://docs.rs/yaml-rust

use crate::error::{DatastoreError, Result};
use crate::models::TimeSeries;
use chrono::Local;
use std::io::Write;
use yaml_rust::yaml::Hash;
use yaml_rust::{Yaml, YamlEmitter};

pub const DMS_FORMAT: &str = "dwr-dms-1.0";
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Ordered header entries written as `# key: value` lines.
pub type Metadata = Vec<(String, String)>;

/// Renders `entries` as a YAML mapping with every line behind `# `.
/// Values stay strings when read back, whatever they look like.
pub fn yaml_header_block(entries: &[(String, String)]) -> Result<String> {
    if entries.is_empty() {
        return Ok(String::new());
    }

    let mut mapping = Hash::new();
    for (key, value) in entries {
        mapping.insert(Yaml::String(key.clone()), Yaml::String(value.clone()));
    }

    let mut dumped = String::new();
    YamlEmitter::new(&mut dumped)
        .dump(&Yaml::Hash(mapping))
        .map_err(|e| DatastoreError::Serialization(format!("yaml header: {:?}", e)))?;

    let body = dumped.strip_prefix("---").unwrap_or(&dumped);
    Ok(body
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| format!("# {}\n", line))
        .collect())
}

/// Writes `series` as a dms1 csv. Missing values are written blank.
pub fn write_ts_csv<W: Write>(
    series: &TimeSeries,
    writer: &mut W,
    metadata: &[(String, String)],
    float_precision: Option<usize>,
) -> Result<()> {
    let mut entries: Metadata = vec![
        ("format".to_string(), DMS_FORMAT.to_string()),
        (
            "date_formatted".to_string(),
            Local::now().format(TIME_FORMAT).to_string(),
        ),
    ];
    entries.extend(
        metadata
            .iter()
            .filter(|(key, _)| key != "format" && key != "date_formatted")
            .cloned(),
    );
    writer.write_all(yaml_header_block(&entries)?.as_bytes())?;

    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(&mut *writer);
    let header = std::iter::once("datetime").chain(series.columns().iter().map(String::as_str));
    csv_writer.write_record(header)?;

    for row in series.rows() {
        let mut record = vec![row.time.format(TIME_FORMAT).to_string()];
        record.extend(row.values.iter().map(|value| match (value, float_precision) {
            (Some(v), Some(p)) => format!("{:.*}", p, v),
            (Some(v), None) => v.to_string(),
            (None, _) => String::new(),
        }));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    drop(csv_writer);

    writer.flush()?;
    Ok(())
}
