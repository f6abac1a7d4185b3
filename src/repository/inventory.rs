// file: src/repository/inventory.rs
// description: repository inventories by file pattern and by data series
// reference: https://docs.rs/csv

use crate::error::Result;
use crate::models::FileMeta;
use crate::reader::header::{header_field, read_yaml_header};
use crate::repository::filename::{interpret_fname, to_wildcard};
use crate::repository::scanner::{RepositoryScanner, ScanOptions};
use crate::stations::StationDatabase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Sources in descending order of preference when one series is held by
/// several sources.
pub const SOURCE_PRIORITY: &[&str] = &["ncro", "usgs", "aquarius", "ccwd", "cdec", "ebmud"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    pub station_id: String,
    pub subloc: Option<String>,
    pub param: String,
    pub source: String,
    pub agency_id: String,
    pub min_year: i32,
    pub max_year: i32,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub unit: Option<String>,
}

struct Listed {
    path: PathBuf,
    meta: FileMeta,
}

/// Top level `*_*.csv` and `*_*.rdb` files that follow the naming convention.
fn list_files(dir: &Path) -> Result<Vec<Listed>> {
    let scanner = RepositoryScanner::new(ScanOptions::default());
    let mut listed = Vec::new();

    for file in scanner.scan_directory(dir)? {
        let name = file.file_name();
        if !name.contains('_') {
            continue;
        }
        match interpret_fname(&name) {
            Ok(meta) => listed.push(Listed {
                path: file.path,
                meta,
            }),
            Err(e) => warn!("Skipping {}: {}", name, e),
        }
    }
    Ok(listed)
}

fn scrape_unit(path: &Path) -> Option<String> {
    match read_yaml_header(path) {
        Ok(header) => header_field(&header, "unit"),
        Err(e) => {
            warn!("Could not read header of {}: {}", path.display(), e);
            None
        }
    }
}

fn entry_for(
    group: &[&Listed],
    source: &str,
    file_pattern: Option<String>,
    stations: Option<&StationDatabase>,
) -> Option<InventoryEntry> {
    let representative = group
        .iter()
        .find(|l| l.meta.agency == source)
        .or_else(|| group.first())?;
    let meta = &representative.meta;
    let station = stations.and_then(|db| db.get(&meta.station_id));

    Some(InventoryEntry {
        file_pattern,
        station_id: meta.station_id.clone(),
        subloc: meta.subloc.clone(),
        param: meta.param.clone(),
        source: source.to_string(),
        agency_id: meta.agency_id.clone(),
        min_year: group.iter().map(|l| l.meta.years.first()).min()?,
        max_year: group.iter().map(|l| l.meta.years.last()).max()?,
        name: station.map(|s| s.name.clone()),
        lat: station.and_then(|s| s.lat),
        lon: station.and_then(|s| s.lon),
        unit: scrape_unit(&representative.path),
    })
}

/// One entry per file pattern, the file name with its year replaced by `*`.
pub fn repo_inventory(dir: &Path, stations: Option<&StationDatabase>) -> Result<Vec<InventoryEntry>> {
    let files = list_files(dir)?;
    let mut groups: BTreeMap<String, Vec<&Listed>> = BTreeMap::new();

    for listed in &files {
        let pattern = to_wildcard(&listed.meta.filename).unwrap_or_else(|| listed.meta.filename.clone());
        groups.entry(pattern).or_default().push(listed);
    }

    let entries: Vec<InventoryEntry> = groups
        .into_iter()
        .filter_map(|(pattern, group)| {
            let source = group.first()?.meta.agency.clone();
            entry_for(&group, &source, Some(pattern), stations)
        })
        .collect();

    info!("Inventoried {} file patterns in {}", entries.len(), dir.display());
    Ok(entries)
}

/// One entry per (station, sublocation, parameter), attributed to the
/// preferred source among those holding the series.
pub fn repo_data_inventory(
    dir: &Path,
    stations: Option<&StationDatabase>,
) -> Result<Vec<InventoryEntry>> {
    let files = list_files(dir)?;
    let mut groups: BTreeMap<(String, Option<String>, String), Vec<&Listed>> = BTreeMap::new();

    for listed in &files {
        let key = (
            listed.meta.station_id.clone(),
            listed.meta.subloc.clone(),
            listed.meta.param.clone(),
        );
        groups.entry(key).or_default().push(listed);
    }

    let entries: Vec<InventoryEntry> = groups
        .into_values()
        .filter_map(|group| {
            let source = group
                .iter()
                .map(|l| l.meta.agency.as_str())
                .reduce(prioritize_source)?
                .to_string();
            entry_for(&group, &source, None, stations)
        })
        .collect();

    info!("Inventoried {} series in {}", entries.len(), dir.display());
    Ok(entries)
}

/// The preferred of two sources. Unlisted sources rank last and ties keep
/// the first.
pub fn prioritize_source<'a>(first: &'a str, second: &'a str) -> &'a str {
    let rank = |s: &str| {
        SOURCE_PRIORITY
            .iter()
            .position(|p| *p == s)
            .unwrap_or(usize::MAX)
    };
    if rank(second) < rank(first) {
        second
    } else {
        first
    }
}

pub fn write_inventory_csv<W: Write>(entries: &[InventoryEntry], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "file_pattern",
        "station_id",
        "subloc",
        "param",
        "source",
        "agency_id",
        "min_year",
        "max_year",
        "name",
        "lat",
        "lon",
        "unit",
    ])?;

    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let num = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();

    for e in entries {
        csv_writer.write_record([
            opt(&e.file_pattern),
            e.station_id.clone(),
            opt(&e.subloc),
            e.param.clone(),
            e.source.clone(),
            e.agency_id.clone(),
            e.min_year.to_string(),
            e.max_year.to_string(),
            opt(&e.name),
            num(e.lat),
            num(e.lon),
            opt(&e.unit),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        let header = "# format: dwr-dms-1.0\n# unit: ft\ndatetime,value\n";
        for name in [
            "cdec_mrz_mrz_elev_2019.csv",
            "cdec_mrz_mrz_elev_2020.csv",
            "ncro_mrz_b9_elev_2018.csv",
            "cdec_anh@upper_anh_ec_2015_2020.csv",
            "README_notes.csv",
            "plain.csv",
        ] {
            fs::write(temp.path().join(name), header).unwrap();
        }
        temp
    }

    #[test]
    fn test_prioritize_source() {
        assert_eq!(prioritize_source("cdec", "ncro"), "ncro");
        assert_eq!(prioritize_source("usgs", "cdec"), "usgs");
        assert_eq!(prioritize_source("des", "ebmud"), "ebmud");
        assert_eq!(prioritize_source("des", "noaa"), "des");
    }

    #[test]
    fn test_repo_inventory_by_pattern() {
        let temp = repo();
        let db = StationDatabase::from_reader(
            "id,agency,agency_id,name,lat,lon\nmrz,noaa,9415144,Martinez,38.03,-122.13\n".as_bytes(),
        )
        .unwrap();

        let entries = repo_inventory(temp.path(), Some(&db)).unwrap();
        assert_eq!(entries.len(), 3);

        let anh = &entries[0];
        assert_eq!(anh.file_pattern.as_deref(), Some("cdec_anh@upper_anh_ec_2015_2020.csv"));
        assert_eq!(anh.subloc.as_deref(), Some("upper"));
        assert_eq!((anh.min_year, anh.max_year), (2015, 2020));

        let mrz = &entries[1];
        assert_eq!(mrz.file_pattern.as_deref(), Some("cdec_mrz_mrz_elev_*.csv"));
        assert_eq!((mrz.min_year, mrz.max_year), (2019, 2020));
        assert_eq!(mrz.name.as_deref(), Some("Martinez"));
        assert_eq!(mrz.lat, Some(38.03));
        assert_eq!(mrz.unit.as_deref(), Some("ft"));
    }

    #[test]
    fn test_repo_data_inventory_prefers_source() {
        let temp = repo();
        let entries = repo_data_inventory(temp.path(), None).unwrap();
        assert_eq!(entries.len(), 2);

        let mrz = entries.iter().find(|e| e.station_id == "mrz").unwrap();
        assert_eq!(mrz.source, "ncro");
        assert_eq!(mrz.agency_id, "b9");
        assert_eq!((mrz.min_year, mrz.max_year), (2018, 2020));
        assert_eq!(mrz.file_pattern, None);
    }

    #[test]
    fn test_write_inventory_csv() {
        let temp = repo();
        let entries = repo_data_inventory(temp.path(), None).unwrap();
        let mut buf = Vec::new();
        write_inventory_csv(&entries, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("file_pattern,station_id,subloc"));
        assert!(text.contains(",mrz,,elev,ncro,b9,2018,2020,,,,ft"));
    }
}
