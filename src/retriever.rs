use crate::chunker::Chunk;
use crate::embeddings::{EmbeddingProvider, KnowledgeBase};
use crate::error::{GrainError, Result};
use crate::loader::SourceFilter;

/// A chunk that cleared the relevance threshold for one query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// Similarity search over a loaded knowledge base, bound to the embedding
/// model that built it
pub struct Retriever<'a> {
    knowledge: &'a KnowledgeBase,
    embedder: &'a EmbeddingProvider,
}

impl<'a> Retriever<'a> {
    /// Fails with `ModelMismatch` when `embedder` is not the model the index
    /// was built with; scores across embedding spaces mean nothing.
    pub fn new(knowledge: &'a KnowledgeBase, embedder: &'a EmbeddingProvider) -> Result<Self> {
        ensure_same_model(knowledge, &embedder.model_id())?;
        Ok(Self {
            knowledge,
            embedder,
        })
    }

    /// Embed `query` and return up to `k` results scoring at least
    /// `threshold`, best first. An empty result is a valid answer.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        threshold: f32,
        filter: SourceFilter,
    ) -> Result<Vec<RetrievedResult>> {
        validate_threshold(threshold)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed(query).await?;
        search_vector(self.knowledge, &query_vector, k, threshold, filter)
    }
}

/// Search with an already-embedded, unit-length query vector
pub fn search_vector(
    knowledge: &KnowledgeBase,
    query_vector: &[f32],
    k: usize,
    threshold: f32,
    filter: SourceFilter,
) -> Result<Vec<RetrievedResult>> {
    validate_threshold(threshold)?;
    let chunks = knowledge.chunks();

    let hits = knowledge
        .index()
        .search(query_vector, k, |i| filter.allows(chunks[i].source_type()))?;

    let results: Vec<RetrievedResult> = hits
        .into_iter()
        .filter(|(_, score)| *score >= threshold)
        .map(|(i, score)| RetrievedResult {
            chunk: chunks[i].clone(),
            score,
        })
        .collect();

    tracing::debug!(
        "Retrieved {} chunks (k={}, threshold={}, source={})",
        results.len(),
        k,
        threshold,
        filter
    );
    Ok(results)
}

pub fn ensure_same_model(knowledge: &KnowledgeBase, session_model: &str) -> Result<()> {
    if knowledge.index().model() != session_model {
        return Err(GrainError::ModelMismatch {
            index: knowledge.index().model().to_string(),
            session: session_model.to_string(),
        });
    }
    Ok(())
}

fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() {
        return Err(GrainError::Config(format!(
            "relevance threshold must be a finite number, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Source ids in retrieval order, each listed once
pub fn sources_used(results: &[RetrievedResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if !sources.iter().any(|s| s == result.chunk.source_id()) {
            sources.push(result.chunk.source_id().to_string());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{normalize, VectorIndex};
    use crate::loader::SourceType;

    fn knowledge() -> KnowledgeBase {
        let rows = [
            ("fees.pdf", SourceType::Pdf, vec![1.0, 0.2, 0.05]),
            ("https://u.edu/fees", SourceType::Web, vec![0.9, 0.2, 0.1]),
            ("rules.pdf", SourceType::Pdf, vec![0.1, 1.0, 0.0]),
            ("https://u.edu/library", SourceType::Web, vec![0.0, 0.3, 1.0]),
            ("fees.pdf", SourceType::Pdf, vec![0.7, 0.7, 0.0]),
        ];
        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        for (i, (source, kind, v)) in rows.into_iter().enumerate() {
            chunks.push(Chunk::new(source, kind, i, format!("chunk {}", i)).unwrap());
            vectors.push(normalize(v));
        }
        KnowledgeBase::new(VectorIndex::build("ollama:test", vectors).unwrap(), chunks).unwrap()
    }

    fn query() -> Vec<f32> {
        normalize(vec![1.0, 0.2, 0.05])
    }

    #[test]
    fn test_results_descend_by_score() {
        let results = search_vector(&knowledge(), &query(), 5, -1.0, SourceFilter::All).unwrap();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].chunk.source_id(), "fees.pdf");
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let kb = knowledge();
        let mut previous = usize::MAX;
        for step in 0..=25 {
            let threshold = -1.0 + step as f32 * 0.1;
            let n = search_vector(&kb, &query(), 5, threshold, SourceFilter::All)
                .unwrap()
                .len();
            assert!(n <= previous, "threshold {} returned more results", threshold);
            previous = n;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_pdf_filter_never_returns_web() {
        let kb = knowledge();
        for q in [query(), normalize(vec![0.0, 0.0, 1.0]), normalize(vec![0.0, 1.0, 0.0])] {
            let results = search_vector(&kb, &q, 5, -1.0, SourceFilter::Pdf).unwrap();
            assert_eq!(results.len(), 3);
            assert!(results.iter().all(|r| r.chunk.source_type() == SourceType::Pdf));
        }
    }

    #[test]
    fn test_web_filter_applied_before_top_k() {
        let results = search_vector(&knowledge(), &query(), 1, -1.0, SourceFilter::Web).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.source_id(), "https://u.edu/fees");
    }

    #[test]
    fn test_everything_filtered_is_empty_not_error() {
        let results = search_vector(&knowledge(), &query(), 5, 1.5, SourceFilter::All).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        assert!(search_vector(&knowledge(), &query(), 5, f32::NAN, SourceFilter::All).is_err());
    }

    #[test]
    fn test_model_mismatch_detected() {
        let kb = knowledge();
        assert!(ensure_same_model(&kb, "ollama:test").is_ok());
        let err = ensure_same_model(&kb, "gemini:text-embedding-004").unwrap_err();
        assert!(matches!(err, GrainError::ModelMismatch { .. }));
    }

    #[test]
    fn test_sources_used_dedups_in_order() {
        let results = search_vector(&knowledge(), &query(), 5, -1.0, SourceFilter::All).unwrap();
        let sources = sources_used(&results);
        assert_eq!(sources[0], "fees.pdf");
        assert_eq!(sources.iter().filter(|s| *s == "fees.pdf").count(), 1);
        assert_eq!(sources.len(), 4);
    }
}
