//! Exact L2 flat vector index.
//!
//! A [`FlatIndex`] stores fixed-dimension `f32` vectors contiguously and
//! answers nearest-neighbor queries by an exact scan under squared
//! Euclidean distance. No quantization, no approximation: corpus sizes
//! here are small enough that exactness beats the recall/latency
//! trade-offs of approximate methods.
//!
//! A vector's id is its insertion position, so index position *i*
//! corresponds 1:1 to chunk mapping id *i*. The index is immutable after
//! build; a new corpus snapshot means a full rebuild.
//!
//! # On-disk format
//!
//! ```text
//! offset  size  field
//! 0       4     magic  b"CFI1"
//! 4       4     dimension, u32 little-endian
//! 8       8     vector count, u64 little-endian
//! 16      …     payload: count × dimension f32, little-endian
//! ```

use serde::Serialize;

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"CFI1";
const HEADER_LEN: usize = 16;

/// Exact flat index over fixed-dimension embedding vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

/// A single search hit: squared L2 distance and the vector's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub distance: f32,
    pub id: usize,
}

impl FlatIndex {
    /// Create an empty index for `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Precondition(
                "index dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector. Its id is its insertion position.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Exact nearest-neighbor scan.
    ///
    /// Returns at most `k` hits ordered nearest-first by squared
    /// Euclidean distance; ties break by ascending id so results are
    /// deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(id, row)| Neighbor {
                distance: squared_l2(query, row),
                id,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Serialize to the on-disk format (little-endian throughout).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.dim as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for &v in &self.data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Deserialize an index previously written by [`FlatIndex::to_bytes`].
    ///
    /// # Errors
    ///
    /// [`Error::CorruptArtifact`] if the buffer is shorter than the
    /// header, carries an unknown magic, declares a zero dimension, or
    /// its payload length disagrees with the declared shape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::CorruptArtifact(format!(
                "index blob is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }
        if &bytes[..4] != MAGIC {
            return Err(Error::CorruptArtifact(
                "unrecognized index magic".to_string(),
            ));
        }

        let dim = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let count = u64::from_le_bytes([
            bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        ]) as usize;

        if dim == 0 {
            return Err(Error::CorruptArtifact(
                "index declares zero dimension".to_string(),
            ));
        }

        let expected = dim
            .checked_mul(count)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                Error::CorruptArtifact("index declares an implausible shape".to_string())
            })?;

        let payload = &bytes[HEADER_LEN..];
        if payload.len() != expected {
            return Err(Error::CorruptArtifact(format!(
                "index payload is {} bytes, expected {} for {} × {}-dim vectors",
                payload.len(),
                expected,
                count,
                dim
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self { dim, data })
    }
}

/// Squared Euclidean distance between two equal-length vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new(3).unwrap();
        index.add(&[1.0, 0.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0, 0.0]).unwrap();
        index.add(&[0.0, 0.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(FlatIndex::new(0).is_err());
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let mut index = FlatIndex::new(3).unwrap();
        let err = index.add(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_identical_vector_is_top_hit_with_zero_distance() {
        let index = sample_index();
        let hits = index.search(&[0.0, 1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_results_ordered_nearest_first() {
        let index = sample_index();
        let hits = index.search(&[0.9, 0.1, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, 0);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        let hits = index.search(&[0.5, 0.5], 2).unwrap();
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[1].id, 1);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = sample_index();
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let index = sample_index();
        let restored = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored, index);
    }

    #[test]
    fn test_empty_index_roundtrip() {
        let index = FlatIndex::new(8).unwrap();
        let restored = FlatIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored.dim(), 8);
        assert!(restored.is_empty());
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let index = sample_index();
        let mut bytes = index.to_bytes();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let index = sample_index();
        let mut bytes = index.to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_short_blob_rejected() {
        assert!(FlatIndex::from_bytes(b"CFI1").is_err());
    }
}
