// file: src/stations/table.rs
// description: comment-aware csv table loading shared by the lookup tables
// reference: https://docs.rs/csv

use crate::error::{DatastoreError, Result};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

pub type Record = BTreeMap<String, String>;

/// Reads a header-first csv table, skipping `#` comment lines and trimming
/// every field.
pub fn read_table(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).map_err(|e| DatastoreError::file(path, e))?;
    read_table_from(file)
}

pub fn read_table_from<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).unwrap_or("").to_string()))
            .collect();
        records.push(record);
    }
    Ok(records)
}

pub fn strip_quotes(value: &str) -> String {
    value.replace('\'', "")
}

pub fn parse_optional_f64(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_table_skips_comments() {
        let text = "# station table\nid,name\n# inline comment\nmrz, Martinez \nanh,Antioch\n";
        let rows = read_table_from(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Martinez");
        assert_eq!(rows[1]["id"], "anh");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let rows = read_table_from("id,name,lat\nmrz,Martinez\n".as_bytes()).unwrap();
        assert_eq!(rows[0]["lat"], "");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'0123"), "0123");
        assert_eq!(parse_optional_f64(Some(&"38.5".to_string())), Some(38.5));
        assert_eq!(parse_optional_f64(Some(&"".to_string())), None);
    }
}
