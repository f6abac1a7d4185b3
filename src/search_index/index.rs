// file: src/search_index/index.rs
// description: documentation search index parsing, validation and serialization
// reference: https://docs.rs/serde_json

use crate::error::{DatastoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

const JS_PREFIX: &str = "Search.setIndex(";

/// Documents holding a term: a lone index or a list of indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocRefs {
    One(usize),
    Many(Vec<usize>),
}

impl DocRefs {
    pub fn docs(&self) -> Vec<usize> {
        match self {
            DocRefs::One(doc) => vec![*doc],
            DocRefs::Many(docs) => docs.clone(),
        }
    }
}

/// Fields are declared in the order the generator writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    #[serde(default)]
    pub alltitles: BTreeMap<String, Vec<(usize, Option<String>)>>,
    pub docnames: Vec<String>,
    #[serde(default)]
    pub envversion: BTreeMap<String, Value>,
    pub filenames: Vec<String>,
    #[serde(default)]
    pub indexentries: BTreeMap<String, Value>,
    #[serde(default)]
    pub objects: BTreeMap<String, Value>,
    #[serde(default)]
    pub objnames: BTreeMap<String, Value>,
    #[serde(default)]
    pub objtypes: BTreeMap<String, Value>,
    pub terms: BTreeMap<String, DocRefs>,
    pub titles: Vec<String>,
    #[serde(default)]
    pub titleterms: BTreeMap<String, DocRefs>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    LengthMismatch {
        docnames: usize,
        filenames: usize,
        titles: usize,
    },
    TermOutOfBounds {
        table: &'static str,
        term: String,
        doc: usize,
    },
    TitleOutOfBounds {
        title: String,
        doc: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LengthMismatch {
                docnames,
                filenames,
                titles,
            } => write!(
                f,
                "docnames ({}), filenames ({}) and titles ({}) differ in length",
                docnames, filenames, titles
            ),
            Violation::TermOutOfBounds { table, term, doc } => {
                write!(f, "{} entry '{}' references missing document {}", table, term, doc)
            }
            Violation::TitleOutOfBounds { title, doc } => {
                write!(f, "title '{}' references missing document {}", title, doc)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub terms: usize,
    pub violations: Vec<Violation>,
}

impl IndexReport {
    pub fn is_well_formed(&self) -> bool {
        self.violations.is_empty()
    }
}

impl SearchIndex {
    /// Accepts `Search.setIndex({...})` with an optional trailing `;` or
    /// the bare JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim().trim_end_matches(';').trim_end();
        let json = match trimmed.strip_prefix(JS_PREFIX) {
            Some(rest) => rest.strip_suffix(')').ok_or_else(|| {
                DatastoreError::SearchIndex("Unterminated Search.setIndex call".to_string())
            })?,
            None => trimmed,
        };
        serde_json::from_str(json)
            .map_err(|e| DatastoreError::SearchIndex(format!("Malformed index: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DatastoreError::file(path, e))?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.docnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docnames.is_empty()
    }

    /// Checks the document lists agree in length and that every reference
    /// from the term and title tables lies within them.
    pub fn validate(&self) -> IndexReport {
        let documents = self.docnames.len();
        let mut violations = Vec::new();

        if self.filenames.len() != documents || self.titles.len() != documents {
            violations.push(Violation::LengthMismatch {
                docnames: documents,
                filenames: self.filenames.len(),
                titles: self.titles.len(),
            });
        }

        let bound = documents.min(self.filenames.len()).min(self.titles.len());

        for (table, entries) in [("terms", &self.terms), ("titleterms", &self.titleterms)] {
            for (term, refs) in entries {
                for doc in refs.docs() {
                    if doc >= bound {
                        violations.push(Violation::TermOutOfBounds {
                            table,
                            term: term.clone(),
                            doc,
                        });
                    }
                }
            }
        }

        for (title, anchors) in &self.alltitles {
            for (doc, _) in anchors {
                if *doc >= bound {
                    violations.push(Violation::TitleOutOfBounds {
                        title: title.clone(),
                        doc: *doc,
                    });
                }
            }
        }

        IndexReport {
            documents,
            terms: self.terms.len(),
            violations,
        }
    }

    pub fn to_js(&self) -> Result<String> {
        Ok(format!("{}{})", JS_PREFIX, serde_json::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"Search.setIndex({"alltitles": {"Intro": [[0, null]], "Usage": [[1, "usage"]]}, "docnames": ["index", "usage"], "envversion": {"sphinx": 63}, "filenames": ["index.rst", "usage.rst"], "indexentries": {}, "objects": {}, "objnames": {}, "objtypes": {}, "terms": {"cach": [0, 1], "read": 1}, "titles": ["Intro", "Usage"], "titleterms": {"usag": 1}});"#;

    #[test]
    fn test_parse_wrapped_and_bare() {
        let wrapped = SearchIndex::parse(SMALL).unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped.terms["read"], DocRefs::One(1));
        assert_eq!(wrapped.terms["cach"], DocRefs::Many(vec![0, 1]));
        assert_eq!(wrapped.alltitles["Intro"], vec![(0, None)]);

        let bare = SMALL
            .trim_start_matches(JS_PREFIX)
            .trim_end_matches(';')
            .trim_end_matches(')');
        assert_eq!(SearchIndex::parse(bare).unwrap(), wrapped);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            SearchIndex::parse("Search.setIndex({\"docnames\": ["),
            Err(DatastoreError::SearchIndex(_))
        ));
        assert!(SearchIndex::parse("not json").is_err());
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let mut index = SearchIndex::parse(SMALL).unwrap();
        assert!(index.validate().is_well_formed());

        index.terms.insert("ghost".to_string(), DocRefs::Many(vec![0, 7]));
        index.titleterms.insert("phantom".to_string(), DocRefs::One(2));
        index
            .alltitles
            .insert("Lost".to_string(), vec![(3, Some("lost".to_string()))]);
        index.titles.pop();

        let report = index.validate();
        assert!(!report.is_well_formed());
        assert_eq!(report.violations.len(), 8);
        assert!(matches!(report.violations[0], Violation::LengthMismatch { titles: 1, .. }));
        assert!(report.violations.contains(&Violation::TermOutOfBounds {
            table: "terms",
            term: "ghost".to_string(),
            doc: 7,
        }));
    }

    #[test]
    fn test_to_js_round_trip() {
        let index = SearchIndex::parse(SMALL).unwrap();
        let js = index.to_js().unwrap();
        assert!(js.starts_with("Search.setIndex({\"alltitles\""));
        assert_eq!(SearchIndex::parse(&js).unwrap(), index);
    }
}
