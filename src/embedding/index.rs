//! Pre-normalized program embedding matrix.

use tracing::info;

use crate::data::programs::Catalogue;

/// Row-major matrix of unit-length program embeddings, one row per catalogue
/// entry. Programs without an embedding get a zero row.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    dim: usize,
    rows: usize,
    matrix: Vec<f32>,
}

/// Scale `v` to unit length. Returns false (leaving `v` untouched) for zero vectors.
fn normalize(v: &mut [f32]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}

/// Cosine similarity of two vectors of equal length; `None` if either is zero.
pub fn cosine(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    (denom > 0.0 && denom.is_finite()).then(|| dot / denom)
}

impl EmbeddingIndex {
    pub fn from_catalogue(catalogue: &Catalogue) -> Self {
        let Some(dim) = catalogue.embedding_dim().filter(|&d| d > 0) else {
            return Self {
                dim: 0,
                rows: catalogue.len(),
                matrix: Vec::new(),
            };
        };

        let mut matrix = vec![0.0f32; dim * catalogue.len()];
        let mut populated = 0usize;
        for (row, program) in matrix.chunks_exact_mut(dim).zip(catalogue.programs()) {
            if let Some(embedding) = &program.embedding {
                row.copy_from_slice(embedding);
                if normalize(row) {
                    populated += 1;
                } else {
                    row.fill(0.0);
                }
            }
        }

        info!(
            rows = catalogue.len(),
            populated, dim, "Built program embedding matrix"
        );
        Self {
            dim,
            rows: catalogue.len(),
            matrix,
        }
    }

    /// Embedding dimension, or `None` when no program has an embedding.
    pub fn dim(&self) -> Option<usize> {
        (self.dim > 0).then_some(self.dim)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Relative cosine similarity of every program to `query`.
    ///
    /// Negative similarities clamp to 0 and the batch is rescaled so its best
    /// match is 1.0. Returns `None` when the query can't be compared (no
    /// matrix, wrong dimension, zero vector).
    pub fn similarities(&self, query: &[f32]) -> Option<Vec<f64>> {
        if self.dim == 0 || query.len() != self.dim {
            return None;
        }
        let mut query = query.to_vec();
        if !normalize(&mut query) {
            return None;
        }

        let mut scores: Vec<f64> = self
            .matrix
            .chunks_exact(self.dim)
            .map(|row| {
                let dot: f32 = row.iter().zip(&query).map(|(a, b)| a * b).sum();
                f64::from(dot).max(0.0)
            })
            .collect();

        let max = scores.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            scores.iter_mut().for_each(|s| *s = (*s / max).min(1.0));
        }
        Some(scores)
    }
}
