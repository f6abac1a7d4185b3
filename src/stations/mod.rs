// file: src/stations/mod.rs
// description: station lookup tables module exports
// reference: internal module structure

pub mod database;
pub mod requests;
pub mod sublocations;
pub mod table;
pub mod variables;

pub use database::StationDatabase;
pub use requests::{process_station_list, stationfile_or_stations, StationInput, StationListOptions};
pub use sublocations::{Sublocation, SublocationTable};
pub use variables::{VariableMapping, VariableMappings};
