// file: src/utils/validation.rs
// description: input validation for paths, urls and date ranges
// reference: input validation patterns

use crate::error::{DatastoreError, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;
use url::Url;

pub struct Validator;

impl Validator {
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            DatastoreError::Validation(format!(
                "Cannot canonicalize path {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(DatastoreError::Validation(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(DatastoreError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(DatastoreError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| DatastoreError::Validation(format!("Invalid URL {}: {}", url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(DatastoreError::Validation(format!(
                "URL must be http or https with a host: {}",
                url
            )));
        }
        Ok(())
    }

    /// An open end is always valid.
    pub fn validate_date_range(start: NaiveDateTime, end: Option<NaiveDateTime>) -> Result<()> {
        if let Some(end) = end
            && end < start
        {
            return Err(DatastoreError::Validation(format!(
                "End {} precedes start {}",
                end, start
            )));
        }
        Ok(())
    }

    pub fn validate_float_precision(precision: usize) -> Result<()> {
        if precision > 15 {
            return Err(DatastoreError::Validation(format!(
                "Float precision too large (max 15): {}",
                precision
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_path() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("station_dbase.csv");
        fs::write(&file_path, "id\n").unwrap();

        assert!(Validator::validate_file_path(&file_path).is_ok());
        assert!(Validator::validate_file_path(temp.path()).is_err());
        assert!(Validator::validate_file_path(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_validate_directory() {
        let temp = TempDir::new().unwrap();
        assert!(Validator::validate_directory(temp.path()).is_ok());
        assert!(Validator::validate_directory(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(Validator::validate_url("https://api.tidesandcurrents.noaa.gov").is_ok());
        assert!(Validator::validate_url("http://cdec.water.ca.gov").is_ok());
        assert!(Validator::validate_url("cdec.water.ca.gov").is_err());
        assert!(Validator::validate_url("ftp://example.com").is_err());
        assert!(Validator::validate_url("http://").is_err());
        assert!(Validator::validate_url("https://exa mple.com/x").is_err());
        assert!(Validator::validate_url("http:// ").is_err());
        assert!(Validator::validate_url("https://api.example.gov/datagetter?product=water_level").is_ok());
    }

    #[test]
    fn test_validate_date_range() {
        let day = |d| {
            NaiveDate::from_ymd_opt(2020, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        assert!(Validator::validate_date_range(day(1), Some(day(2))).is_ok());
        assert!(Validator::validate_date_range(day(2), None).is_ok());
        assert!(Validator::validate_date_range(day(2), Some(day(1))).is_err());
    }

    #[test]
    fn test_validate_float_precision() {
        assert!(Validator::validate_float_precision(3).is_ok());
        assert!(Validator::validate_float_precision(16).is_err());
    }
}
