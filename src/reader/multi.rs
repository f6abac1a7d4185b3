// file: src/reader/multi.rs
// description: priority merge of several file patterns into one series

use crate::error::{DatastoreError, Result};
use crate::models::TimeSeries;
use crate::reader::read_ts::{read_ts, ReadOptions};
use crate::repository::scanner::expand_pattern;
use tracing::{debug, warn};

/// Reads every file matched by `patterns` and merges them, earlier patterns
/// taking priority. Multi-column files are reduced to `selector`, or to
/// the row mean when no selector is given.
pub fn ts_multifile_read(
    patterns: &[String],
    selector: Option<&str>,
    column_name: Option<&str>,
    options: &ReadOptions,
) -> Result<TimeSeries> {
    let mut parts = Vec::new();

    for pattern in patterns {
        for file in expand_pattern(pattern)? {
            let path = file.to_string_lossy().to_string();
            debug!("Reading {}", path);
            let mut ts = read_ts(&path, options)?;

            if ts.columns().len() > 1 {
                ts = match selector {
                    Some(column) => ts.select(&[column.to_string()])?,
                    None => ts.mean_columns("value"),
                };
            }
            if let Some(name) = column_name {
                ts.rename_columns(vec![name.to_string()])?;
            }
            parts.push(ts);
        }
    }

    if parts.is_empty() {
        return Err(DatastoreError::NotFound {
            kind: "file matching patterns",
            name: patterns.join(", "),
        });
    }

    let mut common = None;
    for freq in parts.iter().filter_map(TimeSeries::infer_freq) {
        match common {
            Some(current) if freq < current => {
                warn!("Frequency change detected from {} to {}", current, freq);
                common = Some(freq);
            }
            None => common = Some(freq),
            _ => {}
        }
    }

    let merged = TimeSeries::merge(&parts)?;
    Ok(match common {
        Some(freq) => merged.asfreq(freq),
        None => merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_merges_sources_with_priority() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("ncro_gle_b9_temp_2020.csv"),
            "# format: dwr-dms-1.0\ndatetime,value\n2020-01-01 00:00,10\n2020-01-01 01:00,\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("cdec_gle_b9_temp_2020.csv"),
            "# format: dwr-dms-1.0\ndatetime,upper,lower\n2020-01-01 00:00,1,3\n2020-01-01 00:15,2,4\n2020-01-01 00:30,2,4\n2020-01-01 00:45,2,4\n2020-01-01 01:00,5,7\n",
        )
        .unwrap();

        let patterns = vec![
            temp.path().join("ncro_gle_*.csv").to_string_lossy().to_string(),
            temp.path().join("cdec_gle_*.csv").to_string_lossy().to_string(),
        ];
        let ts = ts_multifile_read(&patterns, None, Some("temp"), &ReadOptions::default()).unwrap();

        assert_eq!(ts.columns(), &["temp".to_string()]);
        assert_eq!(ts.len(), 5);
        let values = ts.column("temp").unwrap();
        assert_eq!(values[0], Some(10.0));
        assert_eq!(values[1], Some(3.0));
        assert_eq!(values[4], Some(6.0));
    }

    #[test]
    fn test_no_matches_is_error() {
        let temp = TempDir::new().unwrap();
        let patterns = vec![temp.path().join("none_*.csv").to_string_lossy().to_string()];
        assert!(ts_multifile_read(&patterns, None, None, &ReadOptions::default()).is_err());
    }
}
