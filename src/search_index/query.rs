// file: src/search_index/query.rs
// description: term lookup and ranked search over a documentation index

use crate::search_index::index::SearchIndex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const TERM_SCORE: u32 = 5;
const TITLE_SCORE: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub doc: usize,
    pub docname: String,
    pub filename: String,
    pub title: String,
    pub score: u32,
}

impl SearchIndex {
    /// Documents holding `term` in their body or title, sorted.
    pub fn documents_for(&self, term: &str) -> Vec<usize> {
        let term = term.to_lowercase();
        let docs: BTreeSet<usize> = [&self.terms, &self.titleterms]
            .iter()
            .filter_map(|table| table.get(&term))
            .flat_map(|refs| refs.docs())
            .collect();
        docs.into_iter().collect()
    }

    /// Ranks documents by summed word scores; ties go to the lower index.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let mut scores: BTreeMap<usize, u32> = BTreeMap::new();

        for word in query
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            for (table, score) in [(&self.terms, TERM_SCORE), (&self.titleterms, TITLE_SCORE)] {
                if let Some(refs) = table.get(&word) {
                    for doc in refs.docs() {
                        *scores.entry(doc).or_default() += score;
                    }
                }
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .filter(|(doc, _)| *doc < self.docnames.len())
            .map(|(doc, score)| SearchHit {
                doc,
                docname: self.docnames[doc].clone(),
                filename: self.filenames.get(doc).cloned().unwrap_or_default(),
                title: self.titles.get(doc).cloned().unwrap_or_default(),
                score,
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.doc.cmp(&b.doc)));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{"docnames": ["a", "b", "c"], "filenames": ["a.rst", "b.rst", "c.rst"], "titles": ["A", "B", "C"], "terms": {"flow": [0, 2], "noaa": 1, "tide": 2}, "titleterms": {"noaa": 2, "flow": 2}}"#;

    #[test]
    fn test_documents_for() {
        let index = SearchIndex::parse(INDEX).unwrap();
        assert_eq!(index.documents_for("NOAA"), vec![1, 2]);
        assert_eq!(index.documents_for("flow"), vec![0, 2]);
        assert!(index.documents_for("missing").is_empty());
    }

    #[test]
    fn test_search_ranking() {
        let index = SearchIndex::parse(INDEX).unwrap();
        let hits = index.search("noaa tide");
        let ranked: Vec<(usize, u32)> = hits.iter().map(|h| (h.doc, h.score)).collect();
        assert_eq!(ranked, vec![(2, 20), (1, 5)]);
        assert_eq!(hits[0].filename, "c.rst");

        let ties = index.search("flow");
        assert_eq!(ties[0].doc, 2);
        assert_eq!(ties[1].doc, 0);
        assert!(index.search("  ").is_empty());
    }
}
