// file: src/exporter/json.rs
// description: json export of repository inventories and search results

use crate::error::{DatastoreError, Result};
use crate::repository::InventoryEntry;
use crate::search_index::SearchHit;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    exported_at: String,
    kind: &'static str,
    total: usize,
    items: &'a [T],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub total_items: usize,
    pub files: Vec<String>,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| DatastoreError::file(&output_dir, e))?;
        Ok(Self { output_dir, pretty })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn export_inventory(&self, entries: &[InventoryEntry], name: &str) -> Result<ExportManifest> {
        self.export("inventory", entries, name)
    }

    pub fn export_search_hits(&self, hits: &[SearchHit], name: &str) -> Result<ExportManifest> {
        self.export("search_hits", hits, name)
    }

    fn export<T: Serialize>(&self, kind: &'static str, items: &[T], name: &str) -> Result<ExportManifest> {
        let exported_at = Utc::now().to_rfc3339();
        let envelope = Envelope {
            exported_at: exported_at.clone(),
            kind,
            total: items.len(),
            items,
        };

        let text = if self.pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };

        let path = self.output_dir.join(format!("{}.json", name));
        fs::write(&path, text).map_err(|e| DatastoreError::file(&path, e))?;
        info!("Exported {} {} items to {}", items.len(), kind, path.display());

        Ok(ExportManifest {
            exported_at,
            total_items: items.len(),
            files: vec![path.display().to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn hit(doc: usize, score: u32) -> SearchHit {
        SearchHit {
            doc,
            docname: format!("doc{}", doc),
            filename: format!("doc{}.rst", doc),
            title: format!("Document {}", doc),
            score,
        }
    }

    #[test]
    fn test_exporter_creation() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path().join("nested/out"), false).unwrap();
        assert!(exporter.output_dir().is_dir());
    }

    #[test]
    fn test_export_search_hits() {
        let dir = tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path(), true).unwrap();
        let manifest = exporter
            .export_search_hits(&[hit(1, 15), hit(2, 5)], "cdec")
            .unwrap();

        assert_eq!(manifest.total_items, 2);
        let text = fs::read_to_string(dir.path().join("cdec.json")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "search_hits");
        assert_eq!(value["items"][0]["score"], 15);
        assert_eq!(value["items"][1]["docname"], "doc2");
    }
}
