use crate::{Error, FeatureVector, ItemId, Result, SparseRow};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Storage layout of the similarity index. Both layouts rank exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Contiguous dense rows, full SIMD scan per query
    Flat,
    /// Posting lists over non-zero dimensions
    #[default]
    Inverted,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Flat => write!(f, "flat"),
            IndexKind::Inverted => write!(f, "inverted"),
        }
    }
}

impl std::str::FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(IndexKind::Flat),
            "inverted" => Ok(IndexKind::Inverted),
            other => Err(Error::InvalidConfig(format!("unknown index kind: {}", other))),
        }
    }
}

/// Heap entry: greater means ranked higher (score desc, then id asc)
#[derive(Clone, Copy)]
struct Ranked<'a> {
    score: OrderedFloat<f32>,
    id: &'a ItemId,
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.id.cmp(self.id))
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Exact k-nearest-neighbor index under cosine similarity.
///
/// Every stored vector and every query vector is L2-normalized, so cosine
/// similarity is computed as a plain dot product: no norms at query time.
/// A zero query vector scores 0 against everything.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    kind: IndexKind,
    dim: usize,
    ids: Vec<ItemId>,
    id_to_row: AHashMap<ItemId, usize>,
    rows: Vec<SparseRow>,
    /// Flat: row-major dense storage, `dim` floats per row
    dense: Vec<f32>,
    /// Inverted: (row, weight) postings per dimension
    postings: Vec<Vec<(u32, f32)>>,
}

impl SimilarityIndex {
    /// Build from (id, vector) pairs. The dimension is taken from the first vector.
    pub fn build(kind: IndexKind, vectors: Vec<(ItemId, FeatureVector)>) -> Result<Self> {
        let dim = vectors.first().map(|(_, v)| v.dim()).unwrap_or(0);
        let mut rows = Vec::with_capacity(vectors.len());
        for (id, vector) in vectors {
            if vector.dim() != dim {
                return Err(Error::UnknownDimension {
                    expected: dim,
                    actual: vector.dim(),
                });
            }
            rows.push((id, vector.to_sparse()));
        }
        Self::from_rows(kind, dim, rows)
    }

    /// Build from sparse rows of a `dim`-dimensional space
    pub fn from_rows(kind: IndexKind, dim: usize, rows: Vec<(ItemId, SparseRow)>) -> Result<Self> {
        let mut ids = Vec::with_capacity(rows.len());
        let mut id_to_row = AHashMap::with_capacity(rows.len());
        let mut sparse = Vec::with_capacity(rows.len());

        for (row_idx, (id, row)) in rows.into_iter().enumerate() {
            if row.min_dim() > dim {
                return Err(Error::UnknownDimension {
                    expected: dim,
                    actual: row.min_dim(),
                });
            }
            if id_to_row.insert(id.clone(), row_idx).is_some() {
                return Err(Error::DuplicateItem(id.to_string()));
            }
            ids.push(id);
            sparse.push(row);
        }

        let mut index = Self {
            kind,
            dim,
            ids,
            id_to_row,
            rows: sparse,
            dense: Vec::new(),
            postings: Vec::new(),
        };

        match kind {
            IndexKind::Flat => {
                index.dense = vec![0.0; dim * index.rows.len()];
                for (row_idx, row) in index.rows.iter().enumerate() {
                    let start = row_idx * dim;
                    for (d, w) in row.iter() {
                        index.dense[start + d as usize] = w;
                    }
                }
            }
            IndexKind::Inverted => {
                index.postings = vec![Vec::new(); dim];
                for (row_idx, row) in index.rows.iter().enumerate() {
                    for (d, w) in row.iter() {
                        index.postings[d as usize].push((row_idx as u32, w));
                    }
                }
            }
        }

        Ok(index)
    }

    /// The `k` stored items most similar to `query`, best first.
    ///
    /// Ties are broken by ascending item id. `k` larger than the index
    /// returns every item.
    pub fn query(&self, query: &FeatureVector, k: usize) -> Result<Vec<(ItemId, f32)>> {
        if query.dim() != self.dim {
            return Err(Error::UnknownDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }
        if k == 0 || self.ids.is_empty() {
            return Ok(Vec::new());
        }

        let scores = match self.kind {
            IndexKind::Flat => self.scan_flat(query.as_slice()),
            IndexKind::Inverted => self.scan_postings(query.as_slice()),
        };
        Ok(self.top_k(&scores, k))
    }

    // Both scans sum in f64 and round to f32 once, so items whose scores are
    // equal up to summation order get identical scores and fall to the id tie-break.
    fn scan_flat(&self, query: &[f32]) -> Vec<f32> {
        if self.dim == 0 {
            return vec![0.0; self.ids.len()];
        }
        self.dense
            .chunks_exact(self.dim)
            .map(|row| crate::simd::dot_product_f64(query, row) as f32)
            .collect()
    }

    fn scan_postings(&self, query: &[f32]) -> Vec<f32> {
        let mut scores = vec![0.0f64; self.ids.len()];
        for (d, &q) in query.iter().enumerate() {
            if q == 0.0 {
                continue;
            }
            let q = q as f64;
            for &(row, w) in &self.postings[d] {
                scores[row as usize] += q * w as f64;
            }
        }
        scores.into_iter().map(|s| s as f32).collect()
    }

    fn top_k(&self, scores: &[f32], k: usize) -> Vec<(ItemId, f32)> {
        let k = k.min(scores.len());
        // min-heap over the k best seen so far
        let mut heap: BinaryHeap<Reverse<Ranked<'_>>> = BinaryHeap::with_capacity(k + 1);
        for (row, &score) in scores.iter().enumerate() {
            let candidate = Ranked {
                score: OrderedFloat(score),
                id: &self.ids[row],
            };
            if heap.len() < k {
                heap.push(Reverse(candidate));
            } else if let Some(Reverse(worst)) = heap.peek() {
                if candidate > *worst {
                    heap.pop();
                    heap.push(Reverse(candidate));
                }
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse(r)| (r.id.clone(), r.score.into_inner()))
            .collect()
    }

    /// Stored vector of an item, expanded to dense form
    pub fn vector(&self, id: &ItemId) -> Option<FeatureVector> {
        self.row(id).map(|row| FeatureVector::from_sparse(self.dim, row))
    }

    #[inline]
    pub fn row(&self, id: &ItemId) -> Option<&SparseRow> {
        self.id_to_row.get(id).map(|&r| &self.rows[r])
    }

    /// Build-order position of an item
    #[inline]
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.id_to_row.get(id).copied()
    }

    /// (id, row) pairs in build order
    pub fn rows(&self) -> impl Iterator<Item = (&ItemId, &SparseRow)> {
        self.ids.iter().zip(self.rows.iter())
    }

    #[inline]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    #[inline]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.id_to_row.contains_key(id)
    }

    #[inline]
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(data: Vec<f32>) -> FeatureVector {
        FeatureVector::from_dense(data).normalized()
    }

    fn sample(kind: IndexKind) -> SimilarityIndex {
        SimilarityIndex::build(
            kind,
            vec![
                (ItemId::Integer(1), unit(vec![1.0, 0.0, 0.0])),
                (ItemId::Integer(2), unit(vec![1.0, 1.0, 0.0])),
                (ItemId::Integer(3), unit(vec![0.0, 0.0, 1.0])),
                (ItemId::Integer(4), unit(vec![0.0, 1.0, 0.0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_query_ranks_by_cosine() {
        for kind in [IndexKind::Flat, IndexKind::Inverted] {
            let index = sample(kind);
            let results = index.query(&unit(vec![1.0, 0.0, 0.0]), 2).unwrap();
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].0, ItemId::Integer(1));
            assert!((results[0].1 - 1.0).abs() < 1e-6);
            assert_eq!(results[1].0, ItemId::Integer(2));
        }
    }

    #[test]
    fn test_ties_broken_by_ascending_id() {
        for kind in [IndexKind::Flat, IndexKind::Inverted] {
            let index = SimilarityIndex::build(
                kind,
                vec![
                    (ItemId::Integer(9), unit(vec![1.0, 0.0])),
                    (ItemId::Integer(3), unit(vec![1.0, 0.0])),
                    (ItemId::Integer(5), unit(vec![0.0, 1.0])),
                    (ItemId::Integer(1), unit(vec![0.0, 1.0])),
                ],
            )
            .unwrap();
            let ids: Vec<ItemId> = index
                .query(&unit(vec![1.0, 0.0]), 4)
                .unwrap()
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            assert_eq!(
                ids,
                vec![ItemId::Integer(3), ItemId::Integer(9), ItemId::Integer(1), ItemId::Integer(5)]
            );
        }
    }

    #[test]
    fn test_permuted_products_tie_by_id() {
        // item 2 holds the same weights as item 1, permuted onto other dimensions,
        // and the query permutes them the same way: the dot products are equal
        let (x, y, z) = (0.914f64, 0.773f64, 0.294f64);
        let n = (x * x + y * y + z * z).sqrt();
        let (a, b, c) = ((x / n) as f32, (y / n) as f32, (z / n) as f32);

        let mut item1 = vec![0.0f32; 40];
        item1[..3].copy_from_slice(&[a, b, c]);
        let mut item2 = vec![0.0f32; 40];
        item2[3..6].copy_from_slice(&[c, a, b]);
        let mut query = vec![0.0f32; 40];
        query[..6].copy_from_slice(&[a, b, c, c, a, b]);
        let query = unit(query);

        for kind in [IndexKind::Flat, IndexKind::Inverted] {
            let index = SimilarityIndex::build(
                kind,
                vec![
                    (ItemId::Integer(2), FeatureVector::from_dense(item2.clone())),
                    (ItemId::Integer(1), FeatureVector::from_dense(item1.clone())),
                ],
            )
            .unwrap();
            let results = index.query(&query, 2).unwrap();
            assert_eq!(results[0].0, ItemId::Integer(1), "{}", kind);
            assert_eq!(results[1].0, ItemId::Integer(2), "{}", kind);
            assert_eq!(results[0].1, results[1].1, "{}", kind);
        }
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let index = sample(IndexKind::Inverted);
        assert_eq!(index.query(&unit(vec![0.0, 0.0, 1.0]), 100).unwrap().len(), 4);
        assert!(index.query(&unit(vec![0.0, 0.0, 1.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = sample(IndexKind::Flat);
        let err = index.query(&unit(vec![1.0, 0.0]), 1).unwrap_err();
        assert!(matches!(err, Error::UnknownDimension { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = SimilarityIndex::build(
            IndexKind::Inverted,
            vec![
                (ItemId::Integer(1), unit(vec![1.0])),
                (ItemId::Integer(1), unit(vec![1.0])),
            ],
        );
        assert!(matches!(result, Err(Error::DuplicateItem(_))));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let result = SimilarityIndex::build(
            IndexKind::Flat,
            vec![
                (ItemId::Integer(1), unit(vec![1.0, 0.0])),
                (ItemId::Integer(2), unit(vec![1.0])),
            ],
        );
        assert!(matches!(result, Err(Error::UnknownDimension { .. })));
    }

    #[test]
    fn test_vector_lookup() {
        let index = sample(IndexKind::Inverted);
        let v = index.vector(&ItemId::Integer(2)).unwrap();
        assert_eq!(v, unit(vec![1.0, 1.0, 0.0]));
        assert!(index.vector(&ItemId::Integer(42)).is_none());
    }

    #[test]
    fn test_layouts_agree() {
        let vectors: Vec<(ItemId, FeatureVector)> = (0..40u64)
            .map(|i| {
                let data: Vec<f32> = (0..24)
                    .map(|d| if (i + d) % 5 == 0 { ((i * d) % 7) as f32 + 1.0 } else { 0.0 })
                    .collect();
                (ItemId::Integer(i), unit(data))
            })
            .collect();
        let flat = SimilarityIndex::build(IndexKind::Flat, vectors.clone()).unwrap();
        let inverted = SimilarityIndex::build(IndexKind::Inverted, vectors.clone()).unwrap();

        for (_, query) in vectors.iter().take(10) {
            let a = flat.query(query, 8).unwrap();
            let b = inverted.query(query, 8).unwrap();
            assert_eq!(a.len(), b.len());
            for ((_, s_a), (_, s_b)) in a.iter().zip(b.iter()) {
                assert!((s_a - s_b).abs() < 1e-5);
            }
        }
    }
}
