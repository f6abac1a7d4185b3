// file: src/reader/formats.rs
// description: agency file format detection and csv layouts
// reference: agency csv export conventions

use crate::error::{DatastoreError, Result};
use crate::repository::patterns::{DES_PROVIDER, DMS1_FORMAT, NCRO_PROVIDER};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Supported text formats in detection order. The last resort reader
/// accepts any csv and must stay last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsFormat {
    Dms1Screen,
    Dms1,
    Noaa,
    DesStd,
    CdecCsv2,
    CdecCsv1,
    NcroStd,
    LastResortCsv,
}

pub const READER_ORDER: &[TsFormat] = &[
    TsFormat::Dms1Screen,
    TsFormat::Dms1,
    TsFormat::Noaa,
    TsFormat::DesStd,
    TsFormat::CdecCsv2,
    TsFormat::CdecCsv1,
    TsFormat::NcroStd,
    TsFormat::LastResortCsv,
];

/// How a format lays out its csv text.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub comment: Option<u8>,
    pub skip_rows: usize,
    /// Names assigned to the columns when the file has no usable header.
    pub column_names: Option<Vec<String>>,
    pub has_header: bool,
    /// Columns joined with `time_join` to form the timestamp text.
    pub time_columns: Vec<String>,
    pub time_join: &'static str,
    pub date_format: Option<&'static str>,
    /// Value columns; empty means every column other than the time columns.
    pub values: Vec<String>,
    /// Quality flag column paired with each value column.
    pub qaqc: Vec<Option<String>>,
    pub accept: Vec<String>,
    pub blank_qaqc_good: bool,
    pub allows_selector: bool,
}

impl CsvLayout {
    fn base(time_column: &str) -> Self {
        Self {
            comment: Some(b'#'),
            skip_rows: 0,
            column_names: None,
            has_header: true,
            time_columns: vec![time_column.to_string()],
            time_join: " ",
            date_format: None,
            values: vec![],
            qaqc: vec![],
            accept: vec![],
            blank_qaqc_good: true,
            allows_selector: false,
        }
    }

    fn with_value(mut self, value: &str, qaqc: Option<&str>, accept: &[&str]) -> Self {
        self.values = vec![value.to_string()];
        self.qaqc = vec![qaqc.map(str::to_string)];
        self.accept = accept.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl TsFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TsFormat::Dms1Screen => "read_dms1_screen",
            TsFormat::Dms1 => "read_dms1",
            TsFormat::Noaa => "read_noaa",
            TsFormat::DesStd => "read_des_std",
            TsFormat::CdecCsv2 => "read_cdec2",
            TsFormat::CdecCsv1 => "read_cdec1",
            TsFormat::NcroStd => "read_ncro_std",
            TsFormat::LastResortCsv => "read_last_resort_csv",
        }
    }

    pub fn is_compatible(&self, path: &Path) -> Result<bool> {
        let lines = head_lines(path, 160)?;
        let first = lines.first().map(String::as_str).unwrap_or("");
        let is_csv = path.extension().is_some_and(|e| e == "csv");

        let compatible = match self {
            TsFormat::Dms1Screen => {
                is_csv
                    && DMS1_FORMAT.is_match(first)
                    && lines.iter().skip(1).take(150).any(|l| l.contains("screen:"))
            }
            TsFormat::Dms1 => is_csv && DMS1_FORMAT.is_match(first),
            TsFormat::Noaa => lines.iter().take(15).any(|line| {
                let lower = line.to_lowercase();
                (lower.contains("agency") && lower.contains("noaa"))
                    || lower.contains("x, n, r")
                    || lower.contains("o, f, r, l")
            }),
            TsFormat::DesStd => lines
                .iter()
                .take(7)
                .any(|l| DES_PROVIDER.is_match(&l.to_lowercase())),
            TsFormat::CdecCsv2 => first
                .to_lowercase()
                .starts_with("station_id,duration,sensor_number"),
            TsFormat::CdecCsv1 => first.to_lowercase().starts_with("title:"),
            TsFormat::NcroStd => lines
                .iter()
                .take(7)
                .any(|l| NCRO_PROVIDER.is_match(&l.to_lowercase())),
            TsFormat::LastResortCsv => true,
        };

        Ok(compatible)
    }

    /// Layout of this format, inspecting `sample` where the columns vary
    /// between files.
    pub fn layout(&self, sample: &Path) -> Result<CsvLayout> {
        let layout = match self {
            TsFormat::Dms1Screen => {
                CsvLayout::base("datetime").with_value("value", Some("user_flag"), &["0"])
            }
            TsFormat::Dms1 => CsvLayout {
                allows_selector: true,
                ..CsvLayout::base("datetime")
            },
            TsFormat::Noaa => {
                let (value, qaqc) = noaa_columns(sample)?;
                let mut layout = CsvLayout::base("Date Time").with_value(
                    &value,
                    qaqc.as_deref(),
                    &["0", "p", "v"],
                );
                layout.allows_selector = true;
                layout
            }
            TsFormat::DesStd => CsvLayout::base("time").with_value(
                "value",
                Some("qaqc_flag_id"),
                &["U", "G", "A"],
            ),
            TsFormat::CdecCsv2 => CsvLayout {
                comment: None,
                date_format: Some("%Y%m%d %H%M"),
                ..CsvLayout::base("OBS DATE").with_value(
                    "VALUE",
                    Some("DATA_FLAG"),
                    &["e", "ART", "BRT"],
                )
            },
            TsFormat::CdecCsv1 => CsvLayout {
                comment: None,
                skip_rows: 2,
                has_header: false,
                column_names: Some(vec!["date".into(), "time".into(), "value".into()]),
                time_columns: vec!["date".into(), "time".into()],
                time_join: "",
                date_format: Some("%Y%m%d%H%M"),
                ..CsvLayout::base("date").with_value("value", None, &[])
            },
            TsFormat::NcroStd => CsvLayout {
                column_names: Some(vec![
                    "datetime".into(),
                    "value".into(),
                    "qaqc_code".into(),
                ]),
                ..CsvLayout::base("datetime").with_value(
                    "value",
                    Some("qaqc_code"),
                    &["e", "1", "2"],
                )
            },
            TsFormat::LastResortCsv => CsvLayout {
                allows_selector: true,
                time_columns: vec![],
                ..CsvLayout::base("")
            },
        };
        Ok(layout)
    }
}

impl fmt::Display for TsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The first `n` lines of a file, tolerating invalid UTF-8.
pub fn head_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| DatastoreError::file(path, e))?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    while lines.len() < n {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DatastoreError::file(path, e))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(lines)
}

/// Value column and quality column of a NOAA CO-OPS csv, read from the
/// first non-comment line.
fn noaa_columns(path: &Path) -> Result<(String, Option<String>)> {
    for line in head_lines(path, 60)? {
        if line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 2 {
            break;
        }
        let value = parts[1].to_string();

        if !line.starts_with("Date") {
            return Err(DatastoreError::format(
                path.display().to_string(),
                "Quality labels in file not known",
            ));
        }
        if line.contains("Prediction") {
            return Ok((value, None));
        }
        let qaqc = if parts.get(2) == Some(&"X") {
            Some("X".to_string())
        } else if parts.last() == Some(&"Quality") {
            Some("Quality".to_string())
        } else {
            None
        };
        return Ok((value, qaqc));
    }

    Err(DatastoreError::format(
        path.display().to_string(),
        "Could not determine data columns within 60 lines",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn detect(path: &Path) -> TsFormat {
        *READER_ORDER
            .iter()
            .find(|f| f.is_compatible(path).unwrap())
            .unwrap()
    }

    #[test]
    fn test_detection_order() {
        let temp = TempDir::new().unwrap();

        let dms = write(&temp, "a.csv", "# format: dwr-dms-1.0\ndatetime,value\n");
        assert_eq!(detect(&dms), TsFormat::Dms1);

        let screened = write(
            &temp,
            "b.csv",
            "# format: dwr-dms-1.0\n# screen:\n#   method: auto\ndatetime,value,user_flag\n",
        );
        assert_eq!(detect(&screened), TsFormat::Dms1Screen);

        let noaa = write(
            &temp,
            "c.csv",
            "# agency: noaa\nDate Time, Water Level, X, N, R \n",
        );
        assert_eq!(detect(&noaa), TsFormat::Noaa);

        let cdec2 = write(
            &temp,
            "d.csv",
            "STATION_ID,DURATION,SENSOR_NUMBER,SENSOR_TYPE,DATE TIME,OBS DATE,VALUE,DATA_FLAG,UNITS\n",
        );
        assert_eq!(detect(&cdec2), TsFormat::CdecCsv2);

        let cdec1 = write(&temp, "e.csv", "Title: \"MRZ\"\n\n20200101,0000,1.0\n");
        assert_eq!(detect(&cdec1), TsFormat::CdecCsv1);

        let ncro = write(&temp, "f.csv", "# Provider = DWR-NCRO\ndatetime,value,qaqc\n");
        assert_eq!(detect(&ncro), TsFormat::NcroStd);

        let des = write(&temp, "g.csv", "# provider: dwr-des\ntime,value,qaqc_flag_id\n");
        assert_eq!(detect(&des), TsFormat::DesStd);

        let other = write(&temp, "h.csv", "when,what\n2020-01-01,1\n");
        assert_eq!(detect(&other), TsFormat::LastResortCsv);
    }

    #[test]
    fn test_dms_requires_csv_extension() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "a.txt", "# format: dwr-dms-1.0\n");
        assert!(!TsFormat::Dms1.is_compatible(&path).unwrap());
    }

    #[test]
    fn test_noaa_layout() {
        let temp = TempDir::new().unwrap();
        let preliminary = write(
            &temp,
            "p.csv",
            "# agency: noaa\nDate Time, Water Level, X, N, R \n2020-01-01 00:00,1.0,0,0,0\n",
        );
        let layout = TsFormat::Noaa.layout(&preliminary).unwrap();
        assert_eq!(layout.values, vec!["Water Level".to_string()]);
        assert_eq!(layout.qaqc, vec![Some("X".to_string())]);

        let verified = write(
            &temp,
            "v.csv",
            "Date Time, Water Level, Sigma, O or I (for verified), F, R, L, Quality \n",
        );
        let layout = TsFormat::Noaa.layout(&verified).unwrap();
        assert_eq!(layout.qaqc, vec![Some("Quality".to_string())]);

        let predictions = write(&temp, "t.csv", "Date Time, Prediction\n");
        let layout = TsFormat::Noaa.layout(&predictions).unwrap();
        assert_eq!(layout.values, vec!["Prediction".to_string()]);
        assert_eq!(layout.qaqc, vec![None]);
    }
}
