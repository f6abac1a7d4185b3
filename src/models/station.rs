// file: src/models/station.rs
// description: station records and per-station download requests
// reference: internal data structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub agency: String,
    pub agency_id: String,
    pub name: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Remaining database columns, keyed by header name.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Station {
    pub fn matches(&self, phrase: &str) -> bool {
        let phrase = phrase.to_lowercase();
        self.id.to_lowercase().contains(&phrase)
            || self.name.to_lowercase().contains(&phrase)
            || self.agency_id.to_lowercase().contains(&phrase)
            || self.agency.to_lowercase().contains(&phrase)
    }
}

/// One station/variable combination to fetch from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRequest {
    pub station_id: String,
    pub agency_id: String,
    pub subloc: String,
    pub param: String,
    pub src_var_id: String,
    pub name: Option<String>,
    /// Alternate id used by CDEC when it differs from the station id.
    pub cdec_id: Option<String>,
}

impl StationRequest {
    pub fn is_default_subloc(&self) -> bool {
        self.subloc == "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_matches_any_field() {
        let station = Station {
            id: "mrz".to_string(),
            agency: "dwr".to_string(),
            agency_id: "B9D81281402".to_string(),
            name: "Martinez".to_string(),
            x: None,
            y: None,
            lat: Some(38.03),
            lon: Some(-122.14),
            extra: BTreeMap::new(),
        };

        assert!(station.matches("MRZ"));
        assert!(station.matches("martin"));
        assert!(station.matches("b9d8"));
        assert!(station.matches("DWR"));
        assert!(!station.matches("usgs"));
    }
}
