//! The two entry points that wire loader, chunker, embeddings, retriever and
//! responder together: [`ingest`] builds the knowledge base, [`answer`]
//! serves one question against it.

use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

use crate::chunker::{self, Chunk};
use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, KnowledgeBase, VectorIndex};
use crate::error::{GrainError, Result};
use crate::loader::{self, SourceDocument, SourceFailure, SourceFilter, SourceType, WebScraper};
use crate::responder::{self, Answer};
use crate::retriever::{self, RetrievedResult, Retriever};
use crate::session::Session;

/// What one ingestion run produced
#[derive(Debug)]
pub struct IngestReport {
    pub pdf_documents: usize,
    pub web_documents: usize,
    pub pdf_chunks: usize,
    pub web_chunks: usize,
    pub failures: Vec<SourceFailure>,
    pub index_path: PathBuf,
    pub chunks_path: PathBuf,
    pub dimension: usize,
}

impl IngestReport {
    pub fn total_chunks(&self) -> usize {
        self.pdf_chunks + self.web_chunks
    }
}

/// Load every configured PDF directory and the links file, then build and
/// persist a fresh index. Individual sources may fail; only an empty result
/// is an error.
pub async fn ingest(
    config: &Config,
    embedder: &EmbeddingProvider,
    progress: &ProgressBar,
) -> Result<IngestReport> {
    let mut outcome = loader::LoadOutcome::default();

    for dir in &config.pdf_dirs {
        tracing::info!("Loading PDFs from {}", dir.display());
        outcome.merge(loader::load_pdf_dir(dir));
    }

    tracing::info!("Scraping URLs from {}", config.links_file.display());
    let mut scraper = WebScraper::new(config.scrape_delay)?;
    outcome.merge(scraper.scrape_links_file(&config.links_file).await);

    ingest_documents(config, embedder, outcome.documents, outcome.failures, progress).await
}

/// Chunk, embed, index and save already-loaded documents
pub async fn ingest_documents(
    config: &Config,
    embedder: &EmbeddingProvider,
    documents: Vec<SourceDocument>,
    mut failures: Vec<SourceFailure>,
    progress: &ProgressBar,
) -> Result<IngestReport> {
    let pdf_documents = count_type(&documents, SourceType::Pdf);
    let web_documents = count_type(&documents, SourceType::Web);

    let mut chunks: Vec<Chunk> = Vec::new();
    for doc in &documents {
        let settings = match doc.source_type {
            SourceType::Pdf => &config.pdf_chunks,
            SourceType::Web => &config.web_chunks,
        };
        match chunker::chunk_document(doc, settings) {
            Ok(doc_chunks) => {
                tracing::debug!("{} -> {} chunks", doc.source_id, doc_chunks.len());
                chunks.extend(doc_chunks);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", doc.source_id, e);
                failures.push(SourceFailure {
                    source_id: doc.source_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if chunks.is_empty() {
        return Err(GrainError::Ingestion {
            source_id: "all sources".into(),
            reason: format!(
                "no chunks produced ({} sources failed)",
                failures.len()
            ),
        });
    }

    let pdf_chunks = chunks
        .iter()
        .filter(|c| c.source_type() == SourceType::Pdf)
        .count();
    let web_chunks = chunks.len() - pdf_chunks;
    tracing::info!(
        "Embedding {} chunks ({} pdf, {} web) with {}",
        chunks.len(),
        pdf_chunks,
        web_chunks,
        embedder.model_id()
    );

    progress.set_length(chunks.len() as u64);
    let texts: Vec<String> = chunks.iter().map(|c| c.text().to_string()).collect();
    let vectors = embedder.embed_all(&texts, progress).await?;
    progress.finish_and_clear();

    let index = VectorIndex::build(embedder.model_id(), vectors)?;
    let dimension = index.dimension();
    let knowledge = KnowledgeBase::new(index, chunks)?;
    let (index_path, chunks_path) = knowledge.save(&config.index_dir, &config.index_prefix)?;
    tracing::info!("Saved index to {}", index_path.display());

    Ok(IngestReport {
        pdf_documents,
        web_documents,
        pdf_chunks,
        web_chunks,
        failures,
        index_path,
        chunks_path,
        dimension,
    })
}

fn count_type(documents: &[SourceDocument], source_type: SourceType) -> usize {
    documents
        .iter()
        .filter(|d| d.source_type == source_type)
        .count()
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub source_filter: SourceFilter,
    pub top_k: usize,
    pub threshold: f32,
}

impl QueryRequest {
    /// A request using the session's current filter and configured limits
    pub fn for_session(session: &Session, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            source_filter: session.source_filter(),
            top_k: session.config.top_k,
            threshold: session.config.threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: Answer,
    /// Source ids in retrieval order, each listed once
    pub sources_used: Vec<String>,
    pub retrieved: Vec<RetrievedResult>,
}

/// Answer one question. Conversation questions and small talk are handled
/// without retrieval; everything else is retrieved, then generated.
pub async fn answer(session: &mut Session, request: &QueryRequest) -> Result<QueryResponse> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(GrainError::Config("query must not be empty".into()));
    }

    if let Some(prompt_log) = &session.config.prompt_log {
        if let Err(e) = log_prompt(prompt_log, query) {
            tracing::warn!("Could not write prompt log {}: {}", prompt_log.display(), e);
        }
    }

    if session.remember_history() {
        if let Some(answer) = responder::history_reply(query, session.history()) {
            return Ok(QueryResponse {
                answer,
                sources_used: Vec::new(),
                retrieved: Vec::new(),
            });
        }
    }

    if let Some(answer) = responder::small_talk_reply(query) {
        session.record_query(query);
        return Ok(QueryResponse {
            answer,
            sources_used: Vec::new(),
            retrieved: Vec::new(),
        });
    }

    let retrieved = Retriever::new(session.knowledge(), session.embedder())?
        .search(query, request.top_k, request.threshold, request.source_filter)
        .await?;

    let answer = session
        .responder()
        .generate_with_history(query, &retrieved, session.history())
        .await?;
    session.record_query(query);

    Ok(QueryResponse {
        sources_used: retriever::sources_used(&retrieved),
        answer,
        retrieved,
    })
}

fn log_prompt(path: &Path, query: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        query.replace('\n', " ")
    )
}
