use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrainError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Ingestion failed for {source_id}: {reason}")]
    Ingestion { source_id: String, reason: String },

    #[error("Could not load knowledge base: {0}. Run 'grain ingest' to rebuild it.")]
    IndexLoad(String),

    #[error("Embedding model mismatch: index was built with '{index}', session uses '{session}'")]
    ModelMismatch { index: String, session: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, GrainError>;
