// file: src/repository/filename.rs
// description: conversion between repository file names and their metadata
// reference: repository naming convention

use crate::error::{DatastoreError, Result};
use crate::models::{FileMeta, YearSpan};
use crate::repository::patterns::{
    FNAME_SINGLE_YEAR, FNAME_YEAR_RANGE, TRAILING_SINGLE_YEAR, TRAILING_YEAR_RANGE,
};
use std::path::Path;

fn file_name_of(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Parses `[source]_[station_id]@[subloc]_[agency_id]_[param]_[syear]_[eyear].csv`,
/// or the single year form for yearly shards. Directories are ignored.
pub fn interpret_fname(path: &str) -> Result<FileMeta> {
    let fname = file_name_of(path);

    let (caps, range) = match FNAME_YEAR_RANGE.captures(fname) {
        Some(caps) => (caps, true),
        None => match FNAME_SINGLE_YEAR.captures(fname) {
            Some(caps) => (caps, false),
            None => {
                return Err(DatastoreError::Naming(format!(
                    "Naming convention not matched for {}",
                    fname
                )));
            }
        },
    };

    let year = |idx: usize| -> Result<i32> {
        caps[idx]
            .parse()
            .map_err(|_| DatastoreError::Naming(format!("Invalid year in {}", fname)))
    };

    let years = if range {
        YearSpan::Range {
            start: year(5)?,
            end: year(6)?,
        }
    } else {
        YearSpan::Single(year(5)?)
    };

    let (station_id, subloc) = match caps[2].split_once('@') {
        Some((id, sub)) => (id.to_string(), Some(sub.to_string())),
        None => (caps[2].to_string(), None),
    };

    Ok(FileMeta {
        filename: caps[0].to_string(),
        agency: caps[1].to_string(),
        station_id,
        subloc,
        agency_id: caps[3].to_string(),
        param: caps[4].to_string(),
        years,
    })
}

/// Inverse of [`interpret_fname`].
pub fn meta_to_filename(meta: &FileMeta) -> String {
    let year_part = match meta.years {
        YearSpan::Single(year) => year.to_string(),
        YearSpan::Range { start, end } => format!("{}_{}", start, end),
    };
    format!(
        "{}_{}_{}_{}_{}.csv",
        meta.agency,
        meta.station_key(),
        meta.agency_id,
        meta.param,
        year_part
    )
}

/// First year of the trailing year block of a file name.
pub fn extract_year_fname(path: &str) -> Result<i32> {
    let fname = file_name_of(path);
    let caps = TRAILING_YEAR_RANGE
        .captures(fname)
        .or_else(|| TRAILING_SINGLE_YEAR.captures(fname))
        .ok_or_else(|| DatastoreError::Naming(format!("No year found in {}", fname)))?;
    caps[1]
        .parse()
        .map_err(|_| DatastoreError::Naming(format!("Invalid year in {}", fname)))
}

/// Replaces the year of a single-year shard name with `*`. Year-range
/// names have no wildcard form.
pub fn to_wildcard(fname: &str) -> Option<String> {
    if TRAILING_YEAR_RANGE.is_match(fname) || !TRAILING_SINGLE_YEAR.is_match(fname) {
        return None;
    }
    let wildcard = TRAILING_SINGLE_YEAR.replace(fname, |caps: &regex::Captures| {
        let matched = &caps[0];
        let ext = &matched[matched.rfind('.').unwrap_or(matched.len())..];
        format!("_*{}", ext)
    });
    Some(wildcard.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interpret_year_range() {
        let meta = interpret_fname("/repo/raw/cdec_mrz@upper_mrz_ec_2010_2020.csv").unwrap();
        assert_eq!(meta.agency, "cdec");
        assert_eq!(meta.station_id, "mrz");
        assert_eq!(meta.subloc.as_deref(), Some("upper"));
        assert_eq!(meta.agency_id, "mrz");
        assert_eq!(meta.param, "ec");
        assert_eq!(
            meta.years,
            YearSpan::Range {
                start: 2010,
                end: 2020
            }
        );
        assert_eq!(meta.filename, "cdec_mrz@upper_mrz_ec_2010_2020.csv");
    }

    #[test]
    fn test_interpret_single_year() {
        let meta = interpret_fname("usgs_sjj_11337190_flow_2021.csv").unwrap();
        assert_eq!(meta.subloc, None);
        assert_eq!(meta.years, YearSpan::Single(2021));
    }

    #[test]
    fn test_interpret_rejects_bad_names() {
        assert!(matches!(
            interpret_fname("README.csv"),
            Err(DatastoreError::Naming(_))
        ));
        assert!(interpret_fname("CDEC_MRZ_MRZ_EC_2010.csv").is_err());
    }

    #[test]
    fn test_meta_to_filename_inverts() {
        for name in [
            "cdec_mrz@upper_mrz_ec_2010_2020.csv",
            "noaa_sffpx_9414290_elev_2022.csv",
        ] {
            let meta = interpret_fname(name).unwrap();
            assert_eq!(meta_to_filename(&meta), name);
        }
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year_fname("a_b_c_d_2019.csv").unwrap(), 2019);
        assert_eq!(extract_year_fname("dir/a_b_c_d_2015_2020.csv").unwrap(), 2015);
        assert!(extract_year_fname("a_b_c_d.csv").is_err());
    }

    #[test]
    fn test_to_wildcard() {
        assert_eq!(
            to_wildcard("ncro_gle_b95_temp_2019.csv").as_deref(),
            Some("ncro_gle_b95_temp_*.csv")
        );
        assert_eq!(to_wildcard("ncro_gle_b95_temp_2019_2020.csv"), None);
        assert_eq!(to_wildcard("notes.txt"), None);
    }
}
