// file: src/stations/variables.rs
// description: mapping between standard variable names and agency codes

use crate::error::Result;
use crate::stations::table::{read_table, read_table_from, Record};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct VariableMapping {
    pub var_name: String,
    pub src_var_id: String,
    pub src_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct VariableMappings {
    mappings: Vec<VariableMapping>,
}

impl VariableMappings {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_records(read_table(path)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_records(read_table_from(reader)?))
    }

    fn from_records(records: Vec<Record>) -> Self {
        let field = |r: &Record, k: &str| r.get(k).cloned().unwrap_or_default();
        let mappings = records
            .iter()
            .map(|r| VariableMapping {
                var_name: field(r, "var_name"),
                src_var_id: field(r, "src_var_id"),
                src_name: field(r, "src_name"),
            })
            .collect();
        Self { mappings }
    }

    /// Agency code for a standard variable at a given source, if mapped.
    pub fn source_code(&self, var_name: &str, source: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.var_name == var_name && m.src_name == source)
            .map(|m| m.src_var_id.as_str())
    }

    /// Standard variable name for an agency code at a given source.
    pub fn standard_name(&self, src_var_id: &str, source: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|m| m.src_var_id == src_var_id && m.src_name == source)
            .map(|m| m.var_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
