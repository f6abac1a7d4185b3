// file: src/cache/store.rs
// description: disk-backed cache of time series results keyed by call arguments
// reference: https://docs.rs/serde_json

use crate::cache::key::{generate_cache_key, parse_cache_key, select_key_args, CacheArgs};
use crate::error::{DatastoreError, Result};
use crate::models::TimeSeries;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub function: String,
    pub data: TimeSeries,
}

/// Every cached result of one function, each row tagged with the key
/// arguments of the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTable {
    pub function: String,
    pub keys: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<CachedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedRow {
    pub time: NaiveDateTime,
    pub key_values: Vec<String>,
    pub values: Vec<Option<f64>>,
}

pub struct DataCache {
    dir: PathBuf,
    size_limit: u64,
}

impl DataCache {
    pub fn open(dir: impl Into<PathBuf>, size_limit: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| DatastoreError::file(&dir, e))?;
        Ok(Self { dir, size_limit })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| DatastoreError::file(&self.dir, e))? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_entry(path: &Path) -> Result<CacheEntry> {
        let text = fs::read_to_string(path).map_err(|e| DatastoreError::file(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn get(&self, key: &str) -> Result<Option<TimeSeries>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let entry = Self::read_entry(&path)?;
        Ok((entry.key == key).then_some(entry.data))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entry_path(key).exists()
    }

    /// Stores `data` under `key`, then evicts the oldest entries while the
    /// cache exceeds its size limit. The new entry is never evicted.
    pub fn insert(&self, key: &str, data: &TimeSeries) -> Result<()> {
        let (function, _) = parse_cache_key(key)?;
        let entry = CacheEntry {
            key: key.to_string(),
            function,
            data: data.clone(),
        };
        let path = self.entry_path(key);
        fs::write(&path, serde_json::to_string(&entry)?)
            .map_err(|e| DatastoreError::file(&path, e))?;
        debug!("Cached {} ({} rows)", key, data.len());
        self.evict(&path)
    }

    fn evict(&self, keep: &Path) -> Result<()> {
        let mut sized: Vec<(SystemTime, u64, PathBuf)> = Vec::new();
        for path in self.entry_files()? {
            let meta = fs::metadata(&path).map_err(|e| DatastoreError::file(&path, e))?;
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            sized.push((modified, meta.len(), path));
        }

        let mut total: u64 = sized.iter().map(|(_, size, _)| size).sum();
        sized.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(&b.2)));

        for (_, size, path) in sized {
            if total <= self.size_limit {
                break;
            }
            if path == keep {
                continue;
            }
            fs::remove_file(&path).map_err(|e| DatastoreError::file(&path, e))?;
            total -= size;
            debug!("Evicted {}", path.display());
        }
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = self
            .entry_files()?
            .iter()
            .map(|p| Self::read_entry(p))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|e| e.key).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entry_files()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn functions(&self) -> Result<BTreeSet<String>> {
        Ok(self.entries()?.into_iter().map(|e| e.function).collect())
    }

    /// Removes every entry, keeping the cache directory.
    pub fn clear(&self) -> Result<usize> {
        let files = self.entry_files()?;
        for path in &files {
            fs::remove_file(path).map_err(|e| DatastoreError::file(path, e))?;
        }
        info!("Cleared {} cache entries", files.len());
        Ok(files.len())
    }

    /// Removes the cache directory itself.
    pub fn delete(self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| DatastoreError::file(&self.dir, e))?;
            info!("Deleted cache directory {}", self.dir.display());
        }
        Ok(())
    }

    /// Returns the cached result for the call or computes and stores it.
    /// Only the arguments named in `key_args` form the key.
    pub fn cached<F>(
        &self,
        func: &str,
        key_args: Option<&[&str]>,
        all_args: &CacheArgs,
        compute: F,
    ) -> Result<TimeSeries>
    where
        F: FnOnce() -> Result<TimeSeries>,
    {
        let key = generate_cache_key(func, &select_key_args(all_args, key_args));
        if let Some(hit) = self.get(&key)? {
            debug!("Cache hit {}", key);
            return Ok(hit);
        }
        let data = compute()?;
        self.insert(&key, &data)?;
        Ok(data)
    }

    pub async fn cached_async<F, Fut>(
        &self,
        func: &str,
        key_args: Option<&[&str]>,
        all_args: &CacheArgs,
        compute: F,
    ) -> Result<TimeSeries>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TimeSeries>>,
    {
        let key = generate_cache_key(func, &select_key_args(all_args, key_args));
        if let Some(hit) = self.get(&key)? {
            debug!("Cache hit {}", key);
            return Ok(hit);
        }
        let data = compute().await?;
        self.insert(&key, &data)?;
        Ok(data)
    }

    /// Concatenates every entry of `func`. Time alone is not unique in the
    /// result; rows are distinguished by their key values.
    pub fn retrieve_all(&self, func: &str) -> Result<CachedTable> {
        let entries: Vec<CacheEntry> = self
            .entries()?
            .into_iter()
            .filter(|e| e.function == func)
            .collect();

        let mut parsed = Vec::with_capacity(entries.len());
        let mut keys: Vec<String> = Vec::new();
        for entry in &entries {
            let (_, args) = parse_cache_key(&entry.key)?;
            for name in args.keys() {
                if !keys.contains(name) {
                    keys.push(name.clone());
                }
            }
            parsed.push(args);
        }

        let columns = entries
            .first()
            .map(|e| e.data.columns().to_vec())
            .unwrap_or_default();

        let mut rows = Vec::new();
        for (entry, args) in entries.iter().zip(&parsed) {
            if entry.data.columns() != columns.as_slice() {
                return Err(DatastoreError::Cache(format!(
                    "Entries of {} have differing columns",
                    func
                )));
            }
            let key_values: Vec<String> = keys
                .iter()
                .map(|k| args.get(k).cloned().unwrap_or_default())
                .collect();
            for row in entry.data.rows() {
                rows.push(CachedRow {
                    time: row.time,
                    key_values: key_values.clone(),
                    values: row.values.clone(),
                });
            }
        }

        Ok(CachedTable {
            function: func.to_string(),
            keys,
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn series(value: f64) -> TimeSeries {
        let t = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeries::univariate("value", vec![(t, Some(value))])
    }

    fn args(pairs: &[(&str, &str)]) -> CacheArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_insert_get_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = DataCache::open(temp.path().join("cache"), 1_000_000).unwrap();

        let key = generate_cache_key("f", &args(&[("station", "mrz")]));
        assert!(!cache.contains(&key));
        assert_eq!(cache.get(&key).unwrap(), None);

        cache.insert(&key, &series(1.0)).unwrap();
        assert!(cache.contains(&key));
        assert_eq!(cache.get(&key).unwrap(), Some(series(1.0)));
        assert_eq!(cache.keys().unwrap(), vec![key.clone()]);

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_cached_computes_once() {
        let temp = TempDir::new().unwrap();
        let cache = DataCache::open(temp.path(), 1_000_000).unwrap();
        let calls = Cell::new(0);
        let all = args(&[("station", "mrz"), ("verbose", "1")]);

        for _ in 0..2 {
            let data = cache
                .cached("fetch", Some(&["station"]), &all, || {
                    calls.set(calls.get() + 1);
                    Ok(series(2.0))
                })
                .unwrap();
            assert_eq!(data, series(2.0));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.keys().unwrap(), vec!["fetch|station=mrz".to_string()]);
    }

    #[tokio::test]
    async fn test_cached_async() {
        let temp = TempDir::new().unwrap();
        let cache = DataCache::open(temp.path(), 1_000_000).unwrap();
        let all = args(&[("station", "anh")]);
        let data = cache
            .cached_async("fetch", None, &all, || async { Ok(series(3.0)) })
            .await
            .unwrap();
        assert_eq!(data, series(3.0));
        assert!(cache.contains("fetch|station=anh"));
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let cache = DataCache::open(temp.path(), 1).unwrap();
        for station in ["a", "b", "c"] {
            let key = generate_cache_key("f", &args(&[("station", station)]));
            cache.insert(&key, &series(1.0)).unwrap();
        }
        assert_eq!(cache.keys().unwrap(), vec!["f|station=c".to_string()]);
    }

    #[test]
    fn test_retrieve_all_tags_rows() {
        let temp = TempDir::new().unwrap();
        let cache = DataCache::open(temp.path(), 1_000_000).unwrap();
        cache.insert("f|station=a", &series(1.0)).unwrap();
        cache.insert("f|station=b", &series(2.0)).unwrap();
        cache.insert("g|x=1", &series(3.0)).unwrap();

        let table = cache.retrieve_all("f").unwrap();
        assert_eq!(table.keys, vec!["station".to_string()]);
        assert_eq!(table.columns, vec!["value".to_string()]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].key_values, vec!["b".to_string()]);
        assert_eq!(table.rows[1].values, vec![Some(2.0)]);

        assert_eq!(
            cache.functions().unwrap().into_iter().collect::<Vec<_>>(),
            vec!["f".to_string(), "g".to_string()]
        );
    }
}
