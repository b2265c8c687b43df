use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::VectorIndex;
use crate::chunker::Chunk;
use crate::error::{GrainError, Result};
use crate::loader::SourceType;

/// On-disk form of the vector index
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    model: String,
    dimension: usize,
    created_at: chrono::DateTime<chrono::Utc>,
    chunk_count: usize,
    /// SHA-256 of the chunk store file this index was written with
    chunks_sha256: String,
    vectors: Vec<Vec<f32>>,
}

/// The vector index plus its parallel chunk store
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    index: VectorIndex,
    chunks: Vec<Chunk>,
}

impl KnowledgeBase {
    pub fn new(index: VectorIndex, chunks: Vec<Chunk>) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(GrainError::Embedding(format!(
                "index holds {} vectors but there are {} chunks",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks of one source type, in index order
    pub fn chunks_by_source_type(&self, source_type: SourceType) -> Vec<&Chunk> {
        self.chunks
            .iter()
            .filter(|c| c.source_type() == source_type)
            .collect()
    }

    /// Paths of the index and chunk files for `prefix` under `dir`
    pub fn paths(dir: &Path, prefix: &str) -> (PathBuf, PathBuf) {
        (
            dir.join(format!("{}_index.json", prefix)),
            dir.join(format!("{}_chunks.json", prefix)),
        )
    }

    /// Write both files, creating `dir` if needed
    pub fn save(&self, dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let (index_path, chunks_path) = Self::paths(dir, prefix);

        let chunks_json = serde_json::to_vec_pretty(&self.chunks)?;
        let file = IndexFile {
            model: self.index.model().to_string(),
            dimension: self.index.dimension(),
            created_at: chrono::Utc::now(),
            chunk_count: self.chunks.len(),
            chunks_sha256: sha256_hex(&chunks_json),
            vectors: self.index.vectors().to_vec(),
        };

        std::fs::write(&chunks_path, &chunks_json)?;
        std::fs::write(&index_path, serde_json::to_vec(&file)?)?;

        tracing::info!(
            "Saved {} chunks to {} and {}",
            self.chunks.len(),
            index_path.display(),
            chunks_path.display()
        );
        Ok((index_path, chunks_path))
    }

    /// Read both files back. Anything missing, unparsable or out of step is
    /// an `IndexLoad` error.
    pub fn load(dir: &Path, prefix: &str) -> Result<Self> {
        let (index_path, chunks_path) = Self::paths(dir, prefix);

        let index_bytes = read_required(&index_path)?;
        let chunks_bytes = read_required(&chunks_path)?;

        let file: IndexFile = serde_json::from_slice(&index_bytes).map_err(|e| {
            GrainError::IndexLoad(format!("{} is corrupt: {}", index_path.display(), e))
        })?;

        if sha256_hex(&chunks_bytes) != file.chunks_sha256 {
            return Err(GrainError::IndexLoad(format!(
                "{} does not match {}",
                chunks_path.display(),
                index_path.display()
            )));
        }

        let chunks: Vec<Chunk> = serde_json::from_slice(&chunks_bytes).map_err(|e| {
            GrainError::IndexLoad(format!("{} is corrupt: {}", chunks_path.display(), e))
        })?;

        if file.vectors.len() != file.chunk_count || chunks.len() != file.chunk_count {
            return Err(GrainError::IndexLoad(format!(
                "expected {} entries, found {} vectors and {} chunks",
                file.chunk_count,
                file.vectors.len(),
                chunks.len()
            )));
        }

        let index = VectorIndex::build(file.model, file.vectors)
            .map_err(|e| GrainError::IndexLoad(e.to_string()))?;
        if index.dimension() != file.dimension {
            return Err(GrainError::IndexLoad(format!(
                "header says dimension {}, vectors have {}",
                file.dimension,
                index.dimension()
            )));
        }

        tracing::debug!("Loaded {} chunks built with {}", chunks.len(), index.model());
        Self::new(index, chunks).map_err(|e| GrainError::IndexLoad(e.to_string()))
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_chunks: self.chunks.len(),
            model: self.index.model().to_string(),
            dimension: self.index.dimension(),
            by_source_type: BTreeMap::new(),
            by_source: BTreeMap::new(),
        };

        for chunk in &self.chunks {
            *stats
                .by_source_type
                .entry(chunk.source_type().to_string())
                .or_insert(0) += 1;
            *stats
                .by_source
                .entry(chunk.source_id().to_string())
                .or_insert(0) += 1;
        }

        stats
    }
}

pub struct StoreStats {
    pub total_chunks: usize,
    pub model: String,
    pub dimension: usize,
    pub by_source_type: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
}

fn read_required(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| GrainError::IndexLoad(format!("cannot read {}: {}", path.display(), e)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
