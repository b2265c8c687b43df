//! Retrieval-augmented question answering over university PDFs and web pages.
//!
//! Sources flow through [`loader`] into [`chunker`], are embedded and indexed
//! by [`embeddings`], searched by [`retriever`] and answered by [`responder`].
//! [`pipeline`] wires these into the `ingest` and `answer` entry points.

pub mod chunker;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod providers;
pub mod responder;
pub mod retriever;
pub mod session;

pub use config::Config;
pub use error::{GrainError, Result};
