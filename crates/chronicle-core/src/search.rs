//! Nearest-neighbor passage retrieval over a loaded index and mapping.
//!
//! The search itself is exact ([`FlatIndex::search`]); this module adds
//! the mapping resolution and context composition steps. A hit whose id
//! is absent from the mapping is skipped with a warning — a short or
//! partially damaged mapping file degrades results, it does not fail a
//! query.

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::index::FlatIndex;
use crate::mapping::ChunkMapping;

/// Separator between passages in a composed context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// A retrieved passage with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Passage {
    /// Chunk id (index position).
    pub id: usize,
    /// Squared L2 distance from the query embedding.
    pub distance: f32,
    /// Chunk text resolved through the mapping.
    pub text: String,
}

/// Search the index for the `top_k` chunks nearest to `query_vec` and
/// resolve their text.
///
/// Returns at most `top_k` passages, nearest-first; fewer (including
/// zero) when some hit ids cannot be resolved through the mapping.
pub fn nearest_passages(
    index: &FlatIndex,
    mapping: &ChunkMapping,
    query_vec: &[f32],
    top_k: usize,
) -> Result<Vec<Passage>> {
    let hits = index.search(query_vec, top_k)?;

    let mut passages = Vec::with_capacity(hits.len());
    for hit in hits {
        match mapping.get(hit.id) {
            Some(text) => passages.push(Passage {
                id: hit.id,
                distance: hit.distance,
                text: text.to_string(),
            }),
            None => warn!(id = hit.id, "search hit has no mapping entry, skipping"),
        }
    }
    Ok(passages)
}

/// Join passage texts into a single context block, preserving
/// nearest-first order.
///
/// An empty slice composes to an empty string — a valid result the
/// downstream prompt-assembly layer must handle.
pub fn compose_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basis_index() -> FlatIndex {
        let mut index = FlatIndex::new(3).unwrap();
        index.add(&[1.0, 0.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0, 0.0]).unwrap();
        index.add(&[0.0, 0.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn test_identical_embedding_returns_its_chunk() {
        let index = basis_index();
        let mapping = ChunkMapping::from_chunks(["zero.", "one.", "two."]);
        let passages = nearest_passages(&index, &mapping, &[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].id, 2);
        assert_eq!(passages[0].distance, 0.0);
        assert_eq!(passages[0].text, "two.");
    }

    #[test]
    fn test_top_k_bound() {
        let index = basis_index();
        let mapping = ChunkMapping::from_chunks(["zero.", "one.", "two."]);
        let passages = nearest_passages(&index, &mapping, &[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(passages.len(), 2);
    }

    #[test]
    fn test_unresolvable_ids_skipped() {
        let index = basis_index();
        // Mapping shorter than the index: id 2 has no entry.
        let mapping = ChunkMapping::from_chunks(["zero.", "one."]);
        let passages = nearest_passages(&index, &mapping, &[0.0, 0.0, 1.0], 3).unwrap();
        assert_eq!(passages.len(), 2);
        assert!(passages.iter().all(|p| p.id != 2));
    }

    #[test]
    fn test_empty_mapping_yields_empty_result() {
        let index = basis_index();
        let mapping = ChunkMapping::new();
        let passages = nearest_passages(&index, &mapping, &[1.0, 0.0, 0.0], 3).unwrap();
        assert!(passages.is_empty());
        assert_eq!(compose_context(&passages), "");
    }

    #[test]
    fn test_compose_joins_with_blank_line() {
        let passages = vec![
            Passage {
                id: 0,
                distance: 0.0,
                text: "first.".to_string(),
            },
            Passage {
                id: 1,
                distance: 0.5,
                text: "second.".to_string(),
            },
        ];
        assert_eq!(compose_context(&passages), "first.\n\nsecond.");
    }
}
