// file: src/store/mod.rs
// description: time series writers and year-partitioned storage
// reference: internal module structure

pub mod partition;
pub mod writer;

pub use partition::{read_by_years, store_by_years, update_by_years};
pub use writer::{write_ts_csv, yaml_header_block, Metadata, DMS_FORMAT, TIME_FORMAT};
