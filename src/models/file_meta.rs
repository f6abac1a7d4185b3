// file: src/models/file_meta.rs
// description: metadata carried by a repository file name
// reference: repository naming convention

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearSpan {
    Single(i32),
    Range { start: i32, end: i32 },
}

impl YearSpan {
    pub fn first(&self) -> i32 {
        match self {
            YearSpan::Single(year) => *year,
            YearSpan::Range { start, .. } => *start,
        }
    }

    pub fn last(&self) -> i32 {
        match self {
            YearSpan::Single(year) => *year,
            YearSpan::Range { end, .. } => *end,
        }
    }

    pub fn overlaps(&self, start_year: i32, end_year: i32) -> bool {
        self.first() <= end_year && self.last() >= start_year
    }
}

/// `[source]_[station_id]@[subloc]_[agency_id]_[param]_[years].csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    pub agency: String,
    pub station_id: String,
    pub subloc: Option<String>,
    pub agency_id: String,
    pub param: String,
    pub years: YearSpan,
}

impl FileMeta {
    /// `station_id@subloc`, or the bare id without a sublocation.
    pub fn station_key(&self) -> String {
        match &self.subloc {
            Some(subloc) => format!("{}@{}", self.station_id, subloc),
            None => self.station_id.clone(),
        }
    }
}
