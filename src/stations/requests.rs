// file: src/stations/requests.rs
// description: expansion of station lists into per-station download requests
// reference: station metadata lookup tables

use crate::error::{DatastoreError, Result};
use crate::models::StationRequest;
use crate::stations::database::StationDatabase;
use crate::stations::table::{read_table, strip_quotes, Record};
use crate::stations::variables::VariableMappings;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum StationInput {
    Ids(Vec<String>),
    File(PathBuf),
}

/// Exactly one of an explicit station list or a single existing station
/// file must be given.
pub fn stationfile_or_stations(files: &[PathBuf], stations: &[String]) -> Result<StationInput> {
    match (files.is_empty(), stations.is_empty()) {
        (true, true) => Err(DatastoreError::Validation(
            "Either station or stationfile required".to_string(),
        )),
        (false, false) => Err(DatastoreError::Validation(
            "Station and stationfile inputs are mutually exclusive".to_string(),
        )),
        (true, false) => Ok(StationInput::Ids(stations.to_vec())),
        (false, true) => {
            if files.len() > 1 {
                return Err(DatastoreError::Validation(
                    "Only one stationfile may be input".to_string(),
                ));
            }
            let file = &files[0];
            if !file.exists() {
                return Err(DatastoreError::Validation(format!(
                    "File does not exist: {}",
                    file.display()
                )));
            }
            Ok(StationInput::File(file.clone()))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StationListOptions<'a> {
    pub id_col: &'a str,
    pub param: Option<&'a str>,
    pub param_col: Option<&'a str>,
    pub stations: Option<&'a StationDatabase>,
    pub variables: Option<&'a VariableMappings>,
    pub source: &'a str,
}

impl<'a> StationListOptions<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            id_col: "id",
            param: None,
            param_col: None,
            stations: None,
            variables: None,
            source,
        }
    }
}

pub fn process_station_list(
    input: &StationInput,
    options: &StationListOptions<'_>,
) -> Result<Vec<StationRequest>> {
    if options.param.is_some() && options.param_col.is_some() {
        return Err(DatastoreError::Validation(
            "Cannot use both param_col and param arguments".to_string(),
        ));
    }

    let records: Vec<Record> = match input {
        StationInput::Ids(ids) => ids
            .iter()
            .map(|id| Record::from([(options.id_col.to_string(), id.clone())]))
            .collect(),
        StationInput::File(path) => read_table(path)?,
    };

    let param_col = options.param_col.unwrap_or("param");

    records
        .iter()
        .map(|record| build_request(record, param_col, options))
        .collect()
}

fn build_request(
    record: &Record,
    param_col: &str,
    options: &StationListOptions<'_>,
) -> Result<StationRequest> {
    let raw_id = record
        .get(options.id_col)
        .map(|v| strip_quotes(v))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            DatastoreError::Validation(format!("Station list row without '{}'", options.id_col))
        })?;
    let station_id = raw_id.to_lowercase();

    let param = match options.param {
        Some(param) => param.to_string(),
        None => record
            .get(param_col)
            .filter(|p| !p.is_empty())
            .cloned()
            .ok_or_else(|| {
                DatastoreError::Validation(format!("No parameter given for station {}", station_id))
            })?,
    };

    let subloc = record
        .get("subloc")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "nan")
        .unwrap_or_else(|| "default".to_string());

    let station = options.stations.and_then(|db| db.get(&station_id));

    let agency_id = station
        .map(|s| s.agency_id.clone())
        .filter(|a| !a.is_empty() && a != "nan")
        .unwrap_or_else(|| raw_id.clone());

    let src_var_id = options
        .variables
        .and_then(|v| v.source_code(&param, options.source))
        .map(str::to_string)
        .unwrap_or_else(|| param.clone());

    let cdec_id = station
        .and_then(|s| s.extra.get("cdec_id"))
        .filter(|c| !c.is_empty())
        .map(|c| c.to_lowercase());

    debug!(
        "Request {} ({}) param {} code {} subloc {}",
        station_id, agency_id, param, src_var_id, subloc
    );

    Ok(StationRequest {
        station_id,
        agency_id: strip_quotes(&agency_id),
        subloc,
        param,
        src_var_id,
        name: station.map(|s| s.name.clone()),
        cdec_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixtures() -> (StationDatabase, VariableMappings) {
        let db = StationDatabase::from_reader(
            "id,agency,agency_id,name,cdec_id\nmrz,dwr,'9415144,Martinez,MRZ\nfoo,dwr,,Foo,\n"
                .as_bytes(),
        )
        .unwrap();
        let vars = VariableMappings::from_reader(
            "var_name,src_var_id,src_name\nelev,water_level,noaa\nec,100,cdec\n".as_bytes(),
        )
        .unwrap();
        (db, vars)
    }

    #[test]
    fn test_stationfile_or_stations() {
        assert!(stationfile_or_stations(&[], &[]).is_err());
        assert!(
            stationfile_or_stations(&[PathBuf::from("a.csv")], &["mrz".to_string()]).is_err()
        );
        assert_eq!(
            stationfile_or_stations(&[], &["mrz".to_string()]).unwrap(),
            StationInput::Ids(vec!["mrz".to_string()])
        );
        assert!(stationfile_or_stations(&[PathBuf::from("/nonexistent/list.csv")], &[]).is_err());
        assert!(
            stationfile_or_stations(&[PathBuf::from("a.csv"), PathBuf::from("b.csv")], &[])
                .is_err()
        );
    }

    #[test]
    fn test_ids_with_lookups() {
        let (db, vars) = fixtures();
        let mut options = StationListOptions::new("noaa");
        options.param = Some("elev");
        options.stations = Some(&db);
        options.variables = Some(&vars);

        let input = StationInput::Ids(vec!["MRZ".to_string(), "foo".to_string(), "xyz".to_string()]);
        let requests = process_station_list(&input, &options).unwrap();

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].station_id, "mrz");
        assert_eq!(requests[0].agency_id, "9415144");
        assert_eq!(requests[0].src_var_id, "water_level");
        assert_eq!(requests[0].subloc, "default");
        assert_eq!(requests[0].cdec_id.as_deref(), Some("mrz"));
        assert_eq!(requests[0].name.as_deref(), Some("Martinez"));

        // blank agency id and unknown stations fall back to the station id
        assert_eq!(requests[1].agency_id, "foo");
        assert_eq!(requests[2].agency_id, "xyz");
        assert_eq!(requests[2].name, None);
    }

    #[test]
    fn test_station_file_with_param_column() {
        let (db, vars) = fixtures();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stations.csv");
        fs::write(&path, "# requests\nid,subloc,param\nmrz,lower,ec\nmrz,,flow\n").unwrap();

        let mut options = StationListOptions::new("cdec");
        options.stations = Some(&db);
        options.variables = Some(&vars);

        let requests = process_station_list(&StationInput::File(path), &options).unwrap();
        assert_eq!(requests[0].subloc, "lower");
        assert_eq!(requests[0].src_var_id, "100");
        assert_eq!(requests[1].subloc, "default");
        assert_eq!(requests[1].src_var_id, "flow");
    }

    #[test]
    fn test_param_and_param_col_exclusive() {
        let mut options = StationListOptions::new("cdec");
        options.param = Some("ec");
        options.param_col = Some("variable");
        let input = StationInput::Ids(vec!["mrz".to_string()]);
        assert!(process_station_list(&input, &options).is_err());
    }

    #[test]
    fn test_missing_param_is_error() {
        let options = StationListOptions::new("cdec");
        let input = StationInput::Ids(vec!["mrz".to_string()]);
        assert!(process_station_list(&input, &options).is_err());
    }
}
