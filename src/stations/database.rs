// file: src/stations/database.rs
// description: station database loading, lookup and phrase search
// reference: station metadata lookup tables

use crate::error::{DatastoreError, Result};
use crate::models::Station;
use crate::stations::table::{parse_optional_f64, read_table, read_table_from, strip_quotes, Record};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const CORE_COLUMNS: &[&str] = &["id", "agency", "agency_id", "name", "x", "y", "lat", "lon"];

/// Stations keyed by lowercase id.
#[derive(Debug, Clone, Default)]
pub struct StationDatabase {
    stations: BTreeMap<String, Station>,
}

impl StationDatabase {
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading station database: {}", path.display());
        Self::from_records(read_table(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_records(read_table_from(reader)?)
    }

    fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut stations = BTreeMap::new();
        let mut duplicates = Vec::new();

        for record in records {
            let station = station_from_record(&record)?;
            let key = station.id.to_lowercase();
            if stations.contains_key(&key) {
                duplicates.push(station.id.clone());
                continue;
            }
            stations.insert(key, station);
        }

        if !duplicates.is_empty() {
            return Err(DatastoreError::StationDatabase(format!(
                "Station database has duplicate id keys: {}",
                duplicates.join(", ")
            )));
        }

        debug!("Loaded {} stations", stations.len());
        Ok(Self { stations })
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.get(&strip_quotes(id).to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// Case-insensitive substring match on id, name, agency id or agency,
    /// sorted by id.
    pub fn search(&self, phrase: &str) -> Vec<&Station> {
        self.stations
            .values()
            .filter(|s| s.matches(phrase))
            .collect()
    }
}

fn station_from_record(record: &Record) -> Result<Station> {
    let id = record
        .get("id")
        .map(|v| strip_quotes(v))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            DatastoreError::StationDatabase("Station record without an id".to_string())
        })?;

    let text = |key: &str| record.get(key).cloned().unwrap_or_default();

    let extra = record
        .iter()
        .filter(|(k, _)| !CORE_COLUMNS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(Station {
        id,
        agency: text("agency"),
        agency_id: strip_quotes(&text("agency_id")),
        name: text("name"),
        x: parse_optional_f64(record.get("x")),
        y: parse_optional_f64(record.get("y")),
        lat: parse_optional_f64(record.get("lat")),
        lon: parse_optional_f64(record.get("lon")),
        extra,
    })
}
