// file: src/store/partition.rs
// description: year-partitioned csv storage of time series

use crate::error::{DatastoreError, Result};
use crate::models::TimeSeries;
use crate::reader::csv_table::read_with_layout;
use crate::reader::formats::TsFormat;
use crate::repository::scanner::expand_pattern;
use crate::store::writer::write_ts_csv;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

fn shard_path(stem: &Path, year: i32) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(format!("_{}.csv", year));
    PathBuf::from(name)
}

/// Writes one `<stem>_<year>.csv` per calendar year in `series`.
pub fn store_by_years(series: &TimeSeries, stem: &Path) -> Result<Vec<PathBuf>> {
    if let Some(parent) = stem.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| DatastoreError::file(parent, e))?;
    }

    let mut written = Vec::new();
    for (year, part) in series.split_by_year() {
        let path = shard_path(stem, year);
        let file = File::create(&path).map_err(|e| DatastoreError::file(&path, e))?;
        let mut writer = BufWriter::new(file);
        write_ts_csv(&part, &mut writer, &[], None)?;
        debug!("Stored {} rows in {}", part.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

pub fn read_by_years(stem: &Path) -> Result<TimeSeries> {
    let pattern = format!("{}_*.csv", stem.display());
    let shards = expand_pattern(&pattern)?;
    let Some(first) = shards.first() else {
        return Err(DatastoreError::NotFound {
            kind: "year partition",
            name: pattern,
        });
    };

    let layout = TsFormat::Dms1.layout(first)?;
    let mut data = TimeSeries::default();
    for shard in &shards {
        data.concat(read_with_layout(shard, &layout, None, None)?.series)?;
    }
    data.dedup_keep_first();
    Ok(data)
}

/// Combines `new` with the stored partitions. The preferred side wins
/// where both have values and the other side fills its gaps.
pub fn update_by_years(new: &TimeSeries, stem: &Path, keep_old: bool) -> Result<TimeSeries> {
    match read_by_years(stem) {
        Ok(old) if keep_old => old.combine_first(new),
        Ok(old) => new.combine_first(&old),
        Err(DatastoreError::NotFound { .. }) => Ok(new.clone()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(points: Vec<(NaiveDateTime, Option<f64>)>) -> TimeSeries {
        TimeSeries::univariate("value", points)
    }

    #[test]
    fn test_store_and_read_by_years() {
        let temp = TempDir::new().unwrap();
        let stem = temp.path().join("nested").join("flow");
        let ts = series(vec![
            (at(2019, 12, 31), Some(1.0)),
            (at(2020, 1, 1), Some(2.0)),
            (at(2020, 6, 1), None),
        ]);

        let written = store_by_years(&ts, &stem).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("flow_2019.csv"));

        let back = read_by_years(&stem).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_update_prefers_new_unless_keep_old() {
        let temp = TempDir::new().unwrap();
        let stem = temp.path().join("stage");
        store_by_years(
            &series(vec![(at(2020, 1, 1), Some(1.0)), (at(2020, 1, 2), None)]),
            &stem,
        )
        .unwrap();

        let new = series(vec![
            (at(2020, 1, 1), Some(10.0)),
            (at(2020, 1, 2), Some(20.0)),
            (at(2020, 1, 3), Some(30.0)),
        ]);

        let updated = update_by_years(&new, &stem, false).unwrap();
        assert_eq!(
            updated.column("value").unwrap(),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );

        let kept = update_by_years(&new, &stem, true).unwrap();
        assert_eq!(
            kept.column("value").unwrap(),
            vec![Some(1.0), Some(20.0), Some(30.0)]
        );
    }

    #[test]
    fn test_update_with_nothing_stored() {
        let temp = TempDir::new().unwrap();
        let new = series(vec![(at(2020, 1, 1), Some(1.0))]);
        let updated = update_by_years(&new, &temp.path().join("empty"), false).unwrap();
        assert_eq!(updated, new);
    }
}
