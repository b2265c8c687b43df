use sha2::{Digest, Sha256};

use crate::error::{GrainError, Result};
use crate::loader::{SourceDocument, SourceType};

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 250;

/// Window length and overlap, both counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    size: usize,
    overlap: usize,
}

impl ChunkSettings {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(GrainError::Config("chunk size must be positive".into()));
        }
        if overlap >= size {
            return Err(GrainError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// One window of source text. Immutable after construction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "StoredChunk")]
pub struct Chunk {
    id: String,
    text: String,
    source_id: String,
    source_type: SourceType,
    position: usize,
}

/// Chunk as read back from the chunks file, before validation
#[derive(serde::Deserialize)]
struct StoredChunk {
    id: String,
    text: String,
    source_id: String,
    source_type: SourceType,
    position: usize,
}

impl TryFrom<StoredChunk> for Chunk {
    type Error = GrainError;

    fn try_from(stored: StoredChunk) -> Result<Self> {
        let chunk = Chunk::new(stored.source_id, stored.source_type, stored.position, stored.text)?;
        if chunk.id != stored.id {
            return Err(GrainError::Config(format!(
                "chunk id {} does not match its content",
                stored.id
            )));
        }
        Ok(chunk)
    }
}

impl Chunk {
    pub fn new(
        source_id: impl Into<String>,
        source_type: SourceType,
        position: usize,
        text: impl Into<String>,
    ) -> Result<Self> {
        let source_id = source_id.into();
        let text = text.into();
        if source_id.trim().is_empty() {
            return Err(GrainError::Config("chunk source id must not be empty".into()));
        }
        if text.is_empty() {
            return Err(GrainError::Config(format!(
                "chunk {} of {} has no text",
                position, source_id
            )));
        }
        Ok(Self {
            id: chunk_id(&source_id, position, &text),
            text,
            source_id,
            source_type,
            position,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Order of this chunk within its source
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Split text into fixed windows of `size` chars, consecutive windows sharing
/// `overlap` chars. The final window may be shorter. Blank text yields nothing.
pub fn chunk_text(text: &str, settings: &ChunkSettings) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + settings.size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += settings.step();
    }

    chunks
}

/// Chunk a loaded document, tagging every window with its source
pub fn chunk_document(doc: &SourceDocument, settings: &ChunkSettings) -> Result<Vec<Chunk>> {
    chunk_text(&doc.text, settings)
        .into_iter()
        .enumerate()
        .map(|(position, text)| Chunk::new(doc.source_id.clone(), doc.source_type, position, text))
        .collect()
}

fn chunk_id(source_id: &str, position: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(position.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_count(len: usize, s: &ChunkSettings) -> usize {
        if len == 0 {
            0
        } else if len <= s.overlap() {
            1
        } else {
            (len - s.overlap()).div_ceil(s.size() - s.overlap())
        }
    }

    #[test]
    fn test_settings_validation() {
        assert!(ChunkSettings::new(0, 0).is_err());
        assert!(ChunkSettings::new(100, 100).is_err());
        assert!(ChunkSettings::new(100, 99).is_ok());
        assert_eq!(ChunkSettings::default().size(), 800);
        assert_eq!(ChunkSettings::default().overlap(), 250);
    }

    #[test]
    fn test_chunk_count_matches_formula() {
        let settings = ChunkSettings::default();
        for len in [1, 249, 250, 251, 799, 800, 801, 1349, 1350, 1351, 5000, 12_345] {
            let text = "a".repeat(len);
            let chunks = chunk_text(&text, &settings);
            assert_eq!(
                chunks.len(),
                expected_count(len, &settings),
                "wrong chunk count for length {}",
                len
            );
        }
    }

    #[test]
    fn test_chunks_bounded_and_overlapping() {
        let settings = ChunkSettings::new(50, 15).unwrap();
        let text: String = (0..437).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, &settings);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            assert_eq!(&prev[prev.len() - 15..], &next[..15]);
        }
        // Reassembling without the overlaps restores the input
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(15));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_last_chunk_kept_short() {
        let settings = ChunkSettings::new(10, 2).unwrap();
        let chunks = chunk_text("0123456789abcde", &settings);
        assert_eq!(chunks, vec!["0123456789", "89abcde"]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        let settings = ChunkSettings::default();
        assert!(chunk_text("", &settings).is_empty());
        assert!(chunk_text("  \n\t ", &settings).is_empty());
    }

    #[test]
    fn test_multibyte_text_not_split_inside_char() {
        let settings = ChunkSettings::new(4, 1).unwrap();
        let chunks = chunk_text("ééééééé", &settings);
        assert_eq!(chunks, vec!["éééé", "éééé"]);
    }

    #[test]
    fn test_chunk_document_tags_source() {
        let doc = SourceDocument {
            source_id: "fees.pdf".into(),
            source_type: SourceType::Pdf,
            text: "x".repeat(1000),
        };
        let chunks = chunk_document(&doc, &ChunkSettings::default()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].position(), 1);
        assert_eq!(chunks[1].source_id(), "fees.pdf");
        assert_eq!(chunks[1].source_type(), SourceType::Pdf);
        assert_ne!(chunks[0].id(), chunks[1].id());
        assert_eq!(chunks[0].id().len(), 16);
    }

    #[test]
    fn test_chunk_new_validates() {
        assert!(Chunk::new("", SourceType::Web, 0, "text").is_err());
        assert!(Chunk::new("https://u.edu", SourceType::Web, 0, "").is_err());
        let a = Chunk::new("https://u.edu", SourceType::Web, 0, "text").unwrap();
        let b = Chunk::new("https://u.edu", SourceType::Web, 0, "text").unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_stored_chunk_is_validated() {
        let chunk = Chunk::new("fees.pdf", SourceType::Pdf, 3, "Tuition is $500").unwrap();
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["text"] = "".into();
        assert!(serde_json::from_value::<Chunk>(value).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["source_id"] = " ".into();
        assert!(serde_json::from_value::<Chunk>(value).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["text"] = "Tuition is $900".into();
        let err = serde_json::from_value::<Chunk>(value).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
