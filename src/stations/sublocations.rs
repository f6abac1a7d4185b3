// file: src/stations/sublocations.rs
// description: station sublocation table (sensor positions such as upper/lower)

use crate::error::{DatastoreError, Result};
use crate::stations::table::{parse_optional_f64, read_table, read_table_from, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sublocation {
    pub id: String,
    pub subloc: String,
    pub z: Option<f64>,
    pub comment: String,
}

#[derive(Debug, Clone, Default)]
pub struct SublocationTable {
    entries: Vec<Sublocation>,
}

impl SublocationTable {
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_records(read_table(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_records(read_table_from(reader)?)
    }

    fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            let entry = Sublocation {
                id: record.get("id").cloned().unwrap_or_default(),
                subloc: record.get("subloc").cloned().unwrap_or_default(),
                z: parse_optional_f64(record.get("z")),
                comment: record.get("comment").cloned().unwrap_or_default(),
            };
            if !seen.insert((entry.id.to_lowercase(), entry.subloc.to_lowercase())) {
                duplicates.push(format!("{}@{}", entry.id, entry.subloc));
                continue;
            }
            entries.push(entry);
        }

        if !duplicates.is_empty() {
            return Err(DatastoreError::StationDatabase(format!(
                "Sublocation table has duplicate (id, subloc) keys: {}",
                duplicates.join(", ")
            )));
        }

        Ok(Self { entries })
    }

    pub fn for_station(&self, id: &str) -> Vec<&Sublocation> {
        self.entries
            .iter()
            .filter(|e| e.id.eq_ignore_ascii_case(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
