// file: src/repository/scanner.rs
// description: repository directory listing and file pattern expansion
// reference: https://docs.rs/walkdir

use crate::error::{DatastoreError, Result};
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["csv".to_string(), "rdb".to_string()],
        }
    }
}

pub struct RepositoryScanner {
    options: ScanOptions,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub size: u64,
    pub modified: u64,
}

impl ScannedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl RepositoryScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Lists data files directly in `root`, sorted by relative path.
    /// Subdirectories are not entered.
    pub fn scan_directory(&self, root: &Path) -> Result<Vec<ScannedFile>> {
        info!("Scanning directory: {}", root.display());
        if !root.is_dir() {
            return Err(DatastoreError::NotFound {
                kind: "directory",
                name: root.display().to_string(),
            });
        }

        let walker = WalkDir::new(root).follow_links(false).max_depth(1);
        let mut files = Vec::new();

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| self.options.extensions.iter().any(|x| x == ext));

            if wanted && let Ok(metadata) = entry.metadata() {
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs())
                    .unwrap_or(0);

                let relative_path = path
                    .strip_prefix(root)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .to_string();

                files.push(ScannedFile {
                    path: path.to_path_buf(),
                    relative_path,
                    size: metadata.len(),
                    modified,
                });
            }
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        info!("Found {} data files", files.len());
        Ok(files)
    }
}

/// Expands a path whose file name may contain glob wildcards into the
/// matching files of its directory, sorted lexically.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let file_pattern = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DatastoreError::Validation(format!("Invalid file pattern: {}", pattern)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !file_pattern.contains(['*', '?', '[']) {
        return Ok(if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            vec![]
        });
    }

    let matcher = compile(file_pattern)?;

    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let mut matches: Vec<PathBuf> = WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| matcher.is_match(e.file_name()))
        .map(|e| e.into_path())
        .collect();

    matches.sort();
    debug!("Pattern {} matched {} files", pattern, matches.len());
    Ok(matches)
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| DatastoreError::Validation(format!("Invalid glob {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("cdec_mrz_mrz_ec_2020.csv"), "x").unwrap();
        fs::write(temp.path().join("usgs_sjj_1133_flow_2020.rdb"), "x").unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/deep_a_b_c_2020.csv"), "x").unwrap();

        let scanner = RepositoryScanner::new(ScanOptions::default());
        let files = scanner.scan_directory(temp.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, "cdec_mrz_mrz_ec_2020.csv");
        assert!(files.iter().all(|f| !f.relative_path.contains("nested")));
    }

    #[test]
    fn test_custom_extensions() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("cdec_mrz_mrz_ec_2020.csv"), "x").unwrap();
        fs::write(temp.path().join("usgs_sjj_1133_flow_2020.rdb"), "x").unwrap();

        let scanner = RepositoryScanner::new(ScanOptions {
            extensions: vec!["rdb".to_string()],
        });
        let files = scanner.scan_directory(temp.path()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), "usgs_sjj_1133_flow_2020.rdb");
    }

    #[test]
    fn test_expand_pattern() {
        let temp = TempDir::new().unwrap();
        for year in [2021, 2019, 2020] {
            fs::write(temp.path().join(format!("ncro_gle_b95_temp_{}.csv", year)), "x").unwrap();
        }
        fs::write(temp.path().join("ncro_gle_b95_ec_2020.csv"), "x").unwrap();

        let pattern = temp.path().join("ncro_gle_*temp_*.csv");
        let matches = expand_pattern(pattern.to_str().unwrap()).unwrap();
        let names: Vec<String> = matches
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "ncro_gle_b95_temp_2019.csv",
                "ncro_gle_b95_temp_2020.csv",
                "ncro_gle_b95_temp_2021.csv"
            ]
        );

        let exact = temp.path().join("ncro_gle_b95_ec_2020.csv");
        assert_eq!(expand_pattern(exact.to_str().unwrap()).unwrap().len(), 1);

        let missing = temp.path().join("nothing_*.csv");
        assert!(expand_pattern(missing.to_str().unwrap()).unwrap().is_empty());
    }
}
