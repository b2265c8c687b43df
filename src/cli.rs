use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigOverrides;
use crate::loader::SourceFilter;
use crate::providers::ProviderOverrides;

#[derive(Parser)]
#[command(
    name = "grain",
    about = "Answer university questions from official PDFs and website pages",
    version
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(global = true, long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load PDFs and web pages, embed them and write a fresh index
    Ingest {
        #[command(flatten)]
        paths: PathArgs,

        /// Chunk length in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared by consecutive chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,

        #[command(flatten)]
        chunking: ChunkArgs,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Answer a single question
    Ask {
        /// The question
        query: String,

        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Interactive question-and-answer session
    Chat {
        #[command(flatten)]
        paths: PathArgs,

        #[command(flatten)]
        retrieval: RetrievalArgs,

        #[command(flatten)]
        providers: ProviderArgs,

        /// Do not carry earlier questions into later prompts
        #[arg(long)]
        no_history: bool,
    },

    /// Show what the current index contains
    Status {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Directory of PDFs to ingest (repeatable)
    #[arg(long = "pdf-dir")]
    pub pdf_dirs: Vec<PathBuf>,

    /// File listing one URL per line
    #[arg(long)]
    pub links_file: Option<PathBuf>,

    /// Directory holding the index files
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// File name prefix of the index files
    #[arg(long)]
    pub index_prefix: Option<String>,
}

/// Chunking for one source type; unset values use --chunk-size/--chunk-overlap
#[derive(Args, Debug, Default)]
pub struct ChunkArgs {
    #[arg(long)]
    pub pdf_chunk_size: Option<usize>,

    #[arg(long)]
    pub pdf_chunk_overlap: Option<usize>,

    #[arg(long)]
    pub web_chunk_size: Option<usize>,

    #[arg(long)]
    pub web_chunk_overlap: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct ProviderArgs {
    /// LLM provider (gemini, openai, anthropic, ollama)
    #[arg(long)]
    pub provider: Option<String>,

    /// LLM model override
    #[arg(long)]
    pub model: Option<String>,

    /// LLM API base URL override
    #[arg(long)]
    pub endpoint: Option<String>,

    /// API key (defaults to the provider's environment variable)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Embedding provider (gemini, openai, ollama)
    #[arg(long)]
    pub embed_provider: Option<String>,

    /// Embedding model override
    #[arg(long)]
    pub embed_model: Option<String>,

    /// Embedding API base URL override
    #[arg(long)]
    pub embed_endpoint: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct RetrievalArgs {
    /// Restrict retrieval to one source type (all, pdf, web)
    #[arg(long, default_value = "all")]
    pub source: SourceFilter,

    /// Candidates requested from the index
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum similarity score for a chunk to be used
    #[arg(long)]
    pub threshold: Option<f32>,
}

impl PathArgs {
    pub fn apply(&self, overrides: &mut ConfigOverrides) {
        overrides.pdf_dirs = self.pdf_dirs.clone();
        overrides.links_file = self.links_file.clone();
        overrides.index_dir = self.index_dir.clone();
        overrides.index_prefix = self.index_prefix.clone();
    }
}

impl ChunkArgs {
    pub fn apply(&self, overrides: &mut ConfigOverrides) {
        overrides.pdf_chunk_size = self.pdf_chunk_size;
        overrides.pdf_chunk_overlap = self.pdf_chunk_overlap;
        overrides.web_chunk_size = self.web_chunk_size;
        overrides.web_chunk_overlap = self.web_chunk_overlap;
    }
}

impl ProviderArgs {
    pub fn apply(&self, overrides: &mut ConfigOverrides) {
        overrides.llm = ProviderOverrides {
            provider: self.provider.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
        };
        // One key serves both roles when they share a provider
        overrides.embedding = ProviderOverrides {
            provider: self.embed_provider.clone(),
            endpoint: self.embed_endpoint.clone(),
            model: self.embed_model.clone(),
            api_key: None,
        };
    }
}

impl RetrievalArgs {
    pub fn apply(&self, overrides: &mut ConfigOverrides) {
        overrides.top_k = self.top_k;
        overrides.threshold = self.threshold;
    }
}
