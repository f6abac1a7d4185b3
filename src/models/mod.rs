// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod file_meta;
pub mod frequency;
pub mod series;
pub mod station;

pub use file_meta::{FileMeta, YearSpan};
pub use frequency::Frequency;
pub use series::{Observation, TimeSeries};
pub use station::{Station, StationRequest};
