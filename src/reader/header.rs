// file: src/reader/header.rs
// description: comment header scraping and YAML header parsing
// reference: https://docs.rs/yaml-rust

use crate::error::{DatastoreError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

/// The run of lines at the top of a file that start with `comment`,
/// joined with newlines. Empty when the file has no header.
pub fn original_header(path: &Path, comment: &str) -> Result<String> {
    let file = File::open(path).map_err(|e| DatastoreError::file(path, e))?;
    let mut header = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| DatastoreError::file(path, e))?;
        if !line.starts_with(comment) {
            break;
        }
        header.push(line.trim_end().to_string());
    }

    Ok(header.join("\n"))
}

/// Parses the comment header as YAML after removing the `#` markers.
pub fn read_yaml_header(path: &Path) -> Result<Yaml> {
    let header = original_header(path, "#")?;
    parse_yaml_header(&header).map_err(|message| DatastoreError::Format {
        file: path.display().to_string(),
        message: format!("Failure reading header: {}", message),
    })
}

fn parse_yaml_header(header: &str) -> std::result::Result<Yaml, String> {
    let body: String = header
        .lines()
        .map(|line| line.replacen('#', "", 1))
        .collect::<Vec<_>>()
        .join("\n");

    let docs = YamlLoader::load_from_str(&body).map_err(|e| e.to_string())?;
    Ok(docs.into_iter().next().unwrap_or(Yaml::Null))
}

/// Scalar header field rendered as a string.
pub fn header_field(header: &Yaml, key: &str) -> Option<String> {
    match &header[key] {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Real(r) => Some(r.clone()),
        Yaml::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
