use serde::{Deserialize, Serialize};

/// Dense feature vector, one weight per vocabulary dimension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    data: Vec<f32>,
}

impl FeatureVector {
    #[inline]
    #[must_use]
    pub fn from_dense(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self { data: vec![0.0; dim] }
    }

    /// Expand a sparse row into a dense vector of `dim` components
    pub fn from_sparse(dim: usize, row: &SparseRow) -> Self {
        let mut data = vec![0.0; dim];
        for (&idx, &value) in row.indices.iter().zip(row.values.iter()) {
            data[idx as usize] = value;
        }
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// True when every component is exactly zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| x == 0.0)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        crate::simd::norm_simd(&self.data)
    }

    /// Dot product; equals cosine similarity when both sides are L2-normalized
    #[inline]
    pub fn dot(&self, other: &FeatureVector) -> f32 {
        crate::simd::dot_product_simd(&self.data, &other.data)
    }

    /// Scale to unit length; a zero vector is left as is
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for x in &mut self.data {
                *x /= norm;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut v = self.clone();
        v.normalize();
        v
    }

    /// Norm is 1 within `tolerance`, or the vector is exactly zero
    pub fn is_normalized(&self, tolerance: f32) -> bool {
        self.is_zero() || (self.norm() - 1.0).abs() <= tolerance
    }

    /// Non-zero components in ascending dimension order
    pub fn to_sparse(&self) -> SparseRow {
        let mut row = SparseRow::default();
        for (idx, &value) in self.data.iter().enumerate() {
            if value != 0.0 {
                row.indices.push(idx as u32);
                row.values.push(value);
            }
        }
        row
    }
}

/// Non-zero weights of one vector, indices strictly ascending
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseRow {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseRow {
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Sum of squares accumulated in index order
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Largest index plus one, or 0 for an empty row
    pub fn min_dim(&self) -> usize {
        self.indices.last().map(|&i| i as usize + 1).unwrap_or(0)
    }
}
