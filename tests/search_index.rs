// file: tests/search_index.rs
// description: searchindex.js fixture checks through the public api

use dstore::search_index::{SearchIndex, Violation};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture() -> SearchIndex {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/searchindex.js");
    SearchIndex::load(&path).unwrap()
}

#[test]
fn test_fixture_is_well_formed() {
    let index = fixture();
    assert_eq!(index.len(), 9);
    assert_eq!(index.titles[1], "Downloading Data");

    let report = index.validate();
    assert!(report.is_well_formed(), "{:?}", report.violations);
    assert_eq!(report.documents, 9);
    assert_eq!(report.terms, index.terms.len());
}

#[test]
fn test_title_matches_outrank_body_matches() {
    let index = fixture();
    let hits = index.search("cdec");

    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].doc, hits[0].score), (1, 15));
    assert_eq!(hits[0].title, "Downloading Data");
    assert_eq!((hits[1].doc, hits[1].score), (2, 5));
}

#[test]
fn test_multi_word_query_sums_scores() {
    let index = fixture();
    let hits = index.search("CDEC download");

    let scores: Vec<(usize, u32)> = hits.iter().map(|h| (h.doc, h.score)).collect();
    assert_eq!(scores, vec![(1, 30), (2, 10), (3, 5), (4, 5), (5, 5)]);
}

#[test]
fn test_rewritten_index_parses_identically() {
    let index = fixture();
    let js = index.to_js().unwrap();
    assert!(js.starts_with("Search.setIndex("));
    assert_eq!(SearchIndex::parse(&js).unwrap(), index);
}

#[test]
fn test_truncated_titles_are_reported() {
    let mut index = fixture();
    index.titles.truncate(8);

    let report = index.validate();
    assert!(!report.is_well_formed());
    assert_eq!(
        report.violations[0],
        Violation::LengthMismatch {
            docnames: 9,
            filenames: 9,
            titles: 8,
        }
    );
    assert!(report
        .violations
        .iter()
        .skip(1)
        .all(|v| matches!(v, Violation::TermOutOfBounds { doc: 8, .. } | Violation::TitleOutOfBounds { doc: 8, .. })));
}
