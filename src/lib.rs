// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod exporter;
pub mod models;
pub mod reader;
pub mod repository;
pub mod search_index;
pub mod stations;
pub mod store;
pub mod utils;

pub use cache::{DataCache, ManageOptions};
pub use config::{CacheConfig, Config, DownloadConfig, ReaderConfig, RepositoryConfig, StationsConfig};
pub use download::{DownloadOptions, DownloadSummary, Fetcher, HttpFetcher};
pub use error::{DatastoreError, Result};
pub use exporter::{ExportManifest, JsonExporter};
pub use models::{FileMeta, Frequency, Observation, Station, StationRequest, TimeSeries, YearSpan};
pub use reader::{read_flagged, read_ts, ts_multifile_read, ReadOptions};
pub use repository::{InventoryEntry, RepositoryScanner, ScannedFile};
pub use search_index::{SearchHit, SearchIndex};
pub use stations::{StationDatabase, SublocationTable, VariableMappings};
pub use store::{read_by_years, store_by_years, update_by_years, write_ts_csv};
pub use utils::Validator;
