use std::cmp::Ordering;

use super::dot;
use crate::error::{GrainError, Result};

/// Exact inner-product index over unit-length vectors.
///
/// Position `i` in the index is row `i` of the chunk store; that order is the
/// only join key between the two. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Build from already-normalised vectors produced by `model`
    pub fn build(model: impl Into<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let model = model.into();
        let dimension = vectors.first().map_or(0, Vec::len);

        if dimension == 0 {
            return Err(GrainError::Embedding(
                "cannot build an index without non-empty vectors".into(),
            ));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
            return Err(GrainError::Embedding(format!(
                "vector {} has dimension {}, expected {}",
                i,
                v.len(),
                dimension
            )));
        }

        Ok(Self {
            model,
            dimension,
            vectors,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Top `k` positions by descending score among positions accepted by
    /// `allow`. Equal scores keep ascending position order.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        allow: impl Fn(usize) -> bool,
    ) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(GrainError::Embedding(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(i, _)| allow(*i))
            .map(|(i, v)| (i, dot(query, v)))
            .collect();

        scored.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => a.0.cmp(&b.0),
            Some(order) => order,
        });
        scored.truncate(k);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> VectorIndex {
        VectorIndex::build(
            "test:model",
            vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.6, 0.8],
                vec![1.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let err = VectorIndex::build("m", vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("vector 1"));
        assert!(VectorIndex::build("m", Vec::new()).is_err());
    }

    #[test]
    fn test_search_orders_by_score_then_position() {
        let hits = index().search(&[1.0, 0.0], 10, |_| true).unwrap();
        let order: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        // 0 and 3 tie at 1.0; lower position first
        assert_eq!(order, vec![0, 3, 2, 1]);
        assert!((hits[2].1 - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_search_respects_k_and_filter() {
        let idx = index();
        assert_eq!(idx.search(&[1.0, 0.0], 2, |_| true).unwrap().len(), 2);
        assert!(idx.search(&[1.0, 0.0], 0, |_| true).unwrap().is_empty());

        let hits = idx.search(&[1.0, 0.0], 10, |i| i % 2 == 1).unwrap();
        assert_eq!(hits.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn test_search_rejects_wrong_dimension() {
        assert!(index().search(&[1.0, 0.0, 0.0], 3, |_| true).is_err());
    }
}
