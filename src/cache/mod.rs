// file: src/cache/mod.rs
// description: local data cache module exports and maintenance entry point
// reference: internal module structure

pub mod csv_io;
pub mod key;
pub mod store;

pub use csv_io::{cache_to_csv, load_cache_csv};
pub use key::{generate_cache_key, parse_cache_key, CacheArgs};
pub use store::{CacheEntry, CachedRow, CachedTable, DataCache};

use crate::error::{DatastoreError, Result};
use std::path::PathBuf;

/// Maintenance actions on the local cache.
#[derive(Debug, Clone, Default)]
pub struct ManageOptions {
    pub clear: bool,
    pub delete: bool,
    pub to_csv: Option<PathBuf>,
    pub from_csv: Option<PathBuf>,
    pub float_precision: Option<usize>,
}

impl ManageOptions {
    pub fn validate(&self) -> Result<()> {
        if self.to_csv.is_some() && (self.clear || self.delete) {
            return Err(DatastoreError::Validation(
                "to_csv and delete/clear are incompatible. Dump to csv, check the result, then delete"
                    .to_string(),
            ));
        }
        if self.from_csv.is_some() && (self.clear || self.delete || self.to_csv.is_some()) {
            return Err(DatastoreError::Validation(
                "from_csv and delete/clear/to_csv are incompatible".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn manage(cache: DataCache, options: &ManageOptions) -> Result<()> {
    options.validate()?;

    if options.clear {
        cache.clear()?;
    }
    if let Some(dir) = &options.to_csv {
        cache_to_csv(&cache, dir, options.float_precision)?;
    }
    if let Some(path) = &options.from_csv {
        load_cache_csv(&cache, path)?;
    }
    if options.delete {
        cache.delete()?;
    }
    Ok(())
}
