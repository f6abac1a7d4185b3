// file: src/cache/csv_io.rs
// description: csv dump and reload of cache contents, one file per function
// reference: https://docs.rs/csv

use crate::cache::key::{generate_cache_key, CacheArgs};
use crate::cache::store::{CachedTable, DataCache};
use crate::error::{DatastoreError, Result};
use crate::models::{Observation, TimeSeries};
use crate::reader::csv_table::{parse_timestamp, parse_value};
use crate::store::TIME_FORMAT;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const INDEX_NAME: &str = "datetime";

/// Writes one `<function>.csv` per cached function into `out_dir`.
pub fn cache_to_csv(
    cache: &DataCache,
    out_dir: &Path,
    float_precision: Option<usize>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|e| DatastoreError::file(out_dir, e))?;

    let mut written = Vec::new();
    for function in cache.functions()? {
        let table = cache.retrieve_all(&function)?;
        if table.rows.is_empty() {
            continue;
        }
        let path = out_dir.join(format!("{}.csv", function));
        let file = File::create(&path).map_err(|e| DatastoreError::file(&path, e))?;
        write_table(&table, BufWriter::new(file), float_precision)?;
        info!("Wrote {} rows for {} to {}", table.rows.len(), function, path.display());
        written.push(path);
    }
    Ok(written)
}

fn write_table<W: Write>(
    table: &CachedTable,
    mut writer: W,
    float_precision: Option<usize>,
) -> Result<()> {
    let mut index_names = vec![INDEX_NAME.to_string()];
    index_names.extend(table.keys.iter().cloned());

    writeln!(writer, "# cached_function: {}", table.function)?;
    writeln!(writer, "# index_name: {}", index_names.join(", "))?;
    writeln!(writer, "# keys: {}", table.keys.join(", "))?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(index_names.iter().chain(&table.columns))?;

    for row in &table.rows {
        let mut record = vec![row.time.format(TIME_FORMAT).to_string()];
        record.extend(row.key_values.iter().cloned());
        record.extend(row.values.iter().map(|v| match (v, float_precision) {
            (Some(v), Some(p)) => format!("{:.*}", p, v),
            (Some(v), None) => v.to_string(),
            (None, _) => String::new(),
        }));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn read_header_map(text: &str) -> HashMap<String, String> {
    text.lines()
        .take_while(|line| line.starts_with('#'))
        .filter_map(|line| line[1..].split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn split_list(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reloads a file written by [`cache_to_csv`], inserting one entry per
/// distinct combination of key values. Returns the number of entries.
pub fn load_cache_csv(cache: &DataCache, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path).map_err(|e| DatastoreError::file(path, e))?;
    let file = path.display().to_string();
    let header = read_header_map(&text);

    let function = header
        .get("cached_function")
        .cloned()
        .ok_or_else(|| DatastoreError::format(&file, "Missing cached_function header"))?;
    let keys = split_list(header.get("keys"));
    let index_name = split_list(header.get("index_name"))
        .into_iter()
        .next()
        .unwrap_or_else(|| INDEX_NAME.to_string());

    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatastoreError::format(&file, format!("Column '{}' not found", name)))
    };
    let time_idx = position(&index_name)?;
    let key_idx = keys.iter().map(|k| position(k)).collect::<Result<Vec<_>>>()?;
    let value_idx: Vec<usize> = (0..headers.len())
        .filter(|i| *i != time_idx && !key_idx.contains(i))
        .collect();
    let columns: Vec<String> = value_idx.iter().map(|&i| headers[i].clone()).collect();

    let mut groups: BTreeMap<Vec<String>, Vec<Observation>> = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let time_text = record.get(time_idx).unwrap_or("");
        let time = parse_timestamp(time_text, None).ok_or_else(|| {
            DatastoreError::format(&file, format!("Unparseable timestamp '{}'", time_text))
        })?;
        let group_key = key_idx
            .iter()
            .map(|&i| record.get(i).unwrap_or("").to_string())
            .collect();
        let values = value_idx
            .iter()
            .map(|&i| parse_value(record.get(i).unwrap_or("")))
            .collect();
        groups
            .entry(group_key)
            .or_default()
            .push(Observation::new(time, values));
    }

    let count = groups.len();
    for (group_key, rows) in groups {
        let args: CacheArgs = keys.iter().cloned().zip(group_key).collect();
        let key = generate_cache_key(&function, &args);
        cache.insert(&key, &TimeSeries::from_rows(columns.clone(), rows)?)?;
    }

    info!("Loaded {} cache entries for {} from {}", count, function, path.display());
    Ok(count)
}
