// file: src/reader/mod.rs
// description: time series file readers module exports
// reference: internal module structure

pub mod csv_table;
pub mod formats;
pub mod freq;
pub mod header;
pub mod multi;
pub mod read_ts;

pub use formats::{CsvLayout, TsFormat, READER_ORDER};
pub use freq::infer_freq_robust;
pub use header::{original_header, read_yaml_header};
pub use multi::ts_multifile_read;
pub use read_ts::{read_flagged, read_ts, ReadOptions};
