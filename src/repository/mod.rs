// file: src/repository/mod.rs
// description: Repository naming, scanning and inventory module exports
// reference: Internal module structure

pub mod filename;
pub mod inventory;
pub mod patterns;
pub mod scanner;

pub use filename::{extract_year_fname, interpret_fname, meta_to_filename, to_wildcard};
pub use inventory::{
    prioritize_source, repo_data_inventory, repo_inventory, write_inventory_csv, InventoryEntry,
};
pub use scanner::{expand_pattern, RepositoryScanner, ScanOptions, ScannedFile};
