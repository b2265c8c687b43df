use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, KnowledgeBase};
use crate::error::Result;
use crate::llm::LlmClient;
use crate::loader::SourceFilter;
use crate::responder::Responder;
use crate::retriever;

/// Everything one conversation needs, passed explicitly to each query
pub struct Session {
    pub config: Config,
    knowledge: KnowledgeBase,
    embedder: EmbeddingProvider,
    responder: Responder,
    source_filter: SourceFilter,
    remember_history: bool,
    history: Vec<String>,
}

impl Session {
    /// Load the persisted knowledge base and connect both providers.
    /// Fails before any query when the index was built with another model.
    pub fn open(config: Config) -> Result<Self> {
        let knowledge = KnowledgeBase::load(&config.index_dir, &config.index_prefix)?;
        let embedder = EmbeddingProvider::new(&config.embedding, config.embed_batch_size)?;
        let responder = Responder::new(LlmClient::new(&config.llm)?);
        Self::from_parts(config, knowledge, embedder, responder)
    }

    pub fn from_parts(
        config: Config,
        knowledge: KnowledgeBase,
        embedder: EmbeddingProvider,
        responder: Responder,
    ) -> Result<Self> {
        retriever::ensure_same_model(&knowledge, &embedder.model_id())?;
        tracing::info!(
            "Session ready: {} chunks, embeddings {}, generation {}:{}",
            knowledge.len(),
            embedder.model_id(),
            responder.client().provider(),
            responder.client().model()
        );
        Ok(Self {
            config,
            knowledge,
            embedder,
            responder,
            source_filter: SourceFilter::All,
            remember_history: true,
            history: Vec::new(),
        })
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn embedder(&self) -> &EmbeddingProvider {
        &self.embedder
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn source_filter(&self) -> SourceFilter {
        self.source_filter
    }

    pub fn set_source_filter(&mut self, filter: SourceFilter) {
        self.source_filter = filter;
    }

    pub fn remember_history(&self) -> bool {
        self.remember_history
    }

    /// Turning memory off also forgets what was already asked
    pub fn set_remember_history(&mut self, enabled: bool) {
        self.remember_history = enabled;
        if !enabled {
            self.history.clear();
        }
    }

    /// Previous questions, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn record_query(&mut self, query: &str) {
        if self.remember_history {
            self.history.push(query.to_string());
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunk;
    use crate::embeddings::VectorIndex;
    use crate::error::GrainError;
    use crate::loader::SourceType;
    use crate::providers::{Provider, ResolvedProvider};

    fn ollama(model: &str) -> ResolvedProvider {
        ResolvedProvider {
            provider: Provider::Ollama,
            endpoint: "http://127.0.0.1:9".into(),
            model: model.into(),
            api_key: None,
        }
    }

    fn config() -> Config {
        Config {
            pdf_dirs: vec![],
            links_file: "links.txt".into(),
            index_dir: "idx".into(),
            index_prefix: "test".into(),
            prompt_log: None,
            pdf_chunks: Default::default(),
            web_chunks: Default::default(),
            top_k: 5,
            threshold: 0.5,
            scrape_delay: std::time::Duration::ZERO,
            embed_batch_size: 8,
            llm: ollama("gemma3:4b"),
            embedding: ollama("nomic-embed-text"),
        }
    }

    fn knowledge(model: &str) -> KnowledgeBase {
        let index = VectorIndex::build(model, vec![vec![1.0, 0.0]]).unwrap();
        let chunks = vec![Chunk::new("fees.pdf", SourceType::Pdf, 0, "Tuition").unwrap()];
        KnowledgeBase::new(index, chunks).unwrap()
    }

    fn session(index_model: &str) -> Result<Session> {
        let config = config();
        let embedder = EmbeddingProvider::new(&config.embedding, 8)?;
        let responder = Responder::new(LlmClient::new(&config.llm)?);
        Session::from_parts(config, knowledge(index_model), embedder, responder)
    }

    #[test]
    fn test_model_mismatch_rejected_at_open() {
        let err = session("openai:text-embedding-3-small").err().unwrap();
        assert!(matches!(err, GrainError::ModelMismatch { .. }));
    }

    #[test]
    fn test_history_recording() {
        let mut s = session("ollama:nomic-embed-text").unwrap();
        s.record_query("fees?");
        s.record_query("hostel?");
        assert_eq!(s.history(), ["fees?", "hostel?"]);

        s.clear_history();
        assert!(s.history().is_empty());

        s.set_remember_history(false);
        s.record_query("ignored");
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_source_filter_defaults_to_all() {
        let mut s = session("ollama:nomic-embed-text").unwrap();
        assert_eq!(s.source_filter(), SourceFilter::All);
        s.set_source_filter(SourceFilter::Web);
        assert_eq!(s.source_filter(), SourceFilter::Web);
    }
}
