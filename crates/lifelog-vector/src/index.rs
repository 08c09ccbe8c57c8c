//! Exact nearest-neighbor index over squared Euclidean distance.
//!
//! [`FlatL2Index`] keeps every vector in one contiguous row-major buffer and
//! answers queries with a full scan. There is no approximation: the same
//! vectors and query always produce the same neighbors in the same order.
//!
//! # Ranking
//!
//! Neighbors are ordered by `(distance, position)` using [`f32::total_cmp`],
//! so equal distances fall back to insertion order (first inserted wins).

use std::cmp::Ordering;

use lifelog_core::{Error, Result};

/// One search result from the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the vector.
    pub position: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

impl Neighbor {
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

/// Squared Euclidean distance, accumulated left to right.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Flat (brute-force) L2 index.
///
/// The dimension is fixed by the first vector added, or up front with
/// [`FlatL2Index::with_dimension`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatL2Index {
    dimension: Option<usize>,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Create an empty index whose dimension is set by the first `add`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with a fixed dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: (dimension > 0).then_some(dimension),
            data: Vec::new(),
        }
    }

    /// Rebuild an index from a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if `data` is not a whole number of rows.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            if !data.is_empty() {
                return Err(Error::invalid_data(
                    "index has vector data but a dimension of zero",
                ));
            }
            return Ok(Self::new());
        }
        if data.len() % dimension != 0 {
            return Err(Error::invalid_data(format!(
                "index buffer of {} floats is not a multiple of dimension {dimension}",
                data.len()
            )));
        }
        Ok(Self {
            dimension: Some(dimension),
            data,
        })
    }

    /// The fixed dimension, if one has been set.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        match self.dimension {
            Some(d) => self.data.len() / d,
            None => 0,
        }
    }

    /// True when no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The row-major vector buffer.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let d = self.dimension?;
        let start = position.checked_mul(d)?;
        self.data.get(start..start + d)
    }

    /// Append vectors in order.
    ///
    /// The whole batch is checked before anything is appended, so a failed
    /// call leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if any vector's length differs
    /// from the index dimension, and [`Error::InvalidData`] if the first
    /// vector of an unsized index is empty.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let dimension = match self.dimension {
            Some(d) => d,
            None => first.as_ref().len(),
        };
        if dimension == 0 {
            return Err(Error::invalid_data("cannot index zero-length vectors"));
        }

        if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != dimension) {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: bad.as_ref().len(),
            });
        }

        self.dimension = Some(dimension);
        self.data.reserve(vectors.len() * dimension);
        for v in vectors {
            self.data.extend_from_slice(v.as_ref());
        }
        Ok(())
    }

    /// The `k` nearest vectors to `query`, closest first.
    ///
    /// Returns `min(k, len())` neighbors. An empty index returns no
    /// neighbors for any query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the query length differs from
    /// the index dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(query, row),
            })
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, Neighbor::rank_cmp);
            scored.truncate(k);
        }
        scored.sort_unstable_by(Neighbor::rank_cmp);
        Ok(scored)
    }
}

// ============================================================================
// Tests
// ============================================================================
