// file: src/search_index/mod.rs
// description: documentation search index module exports
// reference: internal module structure

pub mod index;
pub mod query;

pub use index::{DocRefs, IndexReport, SearchIndex, Violation};
pub use query::SearchHit;
