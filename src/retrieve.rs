//! Nearest-neighbor retrieval over an index snapshot.
//!
//! Exact search: every stored vector is scored with cosine similarity and
//! the top `k` are returned in strictly descending score order. Ties keep
//! the earlier-indexed document first (stable sort over input order).

use std::sync::Arc;

use crate::embedding::cosine_similarity;
use crate::error::SearchError;
use crate::index::Index;
use crate::models::Match;

/// Find the `k` documents most similar to `query`.
///
/// An empty index yields an empty match sequence, not an error. A query
/// whose dimension differs from the index's is a
/// [`SearchError::DimensionMismatch`].
pub fn search(index: &Index, query: &[f32], k: usize) -> Result<Vec<Match>, SearchError> {
    if index.is_empty() {
        return Ok(Vec::new());
    }

    if query.len() != index.dims() {
        return Err(SearchError::DimensionMismatch {
            query: query.len(),
            index: index.dims(),
        });
    }

    let mut matches: Vec<Match> = index
        .entries()
        .iter()
        .map(|entry| Match {
            document: Arc::clone(&entry.document),
            score: cosine_similarity(query, &entry.vector),
        })
        .collect();

    // Stable sort: equal scores preserve input (indexing) order.
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(k);

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexedVector;
    use crate::models::Document;

    fn index_of(vectors: Vec<(&str, Vec<f32>)>) -> Index {
        let dims = vectors.first().map(|(_, v)| v.len()).unwrap_or(2);
        let entries = vectors
            .into_iter()
            .map(|(path, vector)| IndexedVector {
                vector,
                document: Arc::new(Document::new("filesystem", path, path.to_string())),
            })
            .collect();
        Index::new(entries, dims)
    }

    #[test]
    fn empty_index_returns_empty_matches() {
        let index = Index::new(Vec::new(), 4);
        let matches = search(&index, &[1.0, 0.0, 0.0, 0.0], 5).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let index = index_of(vec![("a.md", vec![1.0, 0.0])]);
        let err = search(&index, &[1.0, 0.0, 0.0], 1).unwrap_err();
        assert_eq!(err, SearchError::DimensionMismatch { query: 3, index: 2 });
    }

    #[test]
    fn matches_sorted_descending_and_truncated_to_k() {
        let index = index_of(vec![
            ("far.md", vec![0.0, 1.0]),
            ("near.md", vec![1.0, 0.0]),
            ("mid.md", vec![1.0, 1.0]),
        ]);

        let matches = search(&index, &[1.0, 0.0], 2).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].document.path, "near.md");
        assert_eq!(matches[1].document.path, "mid.md");
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn k_larger_than_index_returns_all() {
        let index = index_of(vec![("a.md", vec![1.0, 0.0]), ("b.md", vec![0.0, 1.0])]);
        let matches = search(&index, &[1.0, 0.0], 10).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn ties_keep_earlier_indexed_document_first() {
        // Both documents are identical directions from the query.
        let index = index_of(vec![
            ("first.md", vec![2.0, 0.0]),
            ("second.md", vec![1.0, 0.0]),
        ]);

        let matches = search(&index, &[1.0, 0.0], 2).unwrap();

        assert!((matches[0].score - matches[1].score).abs() < 1e-6);
        assert_eq!(matches[0].document.path, "first.md");
        assert_eq!(matches[1].document.path, "second.md");
    }
}
