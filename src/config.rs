use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::chunker::{ChunkSettings, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embeddings::provider::DEFAULT_BATCH_SIZE;
use crate::error::{GrainError, Result};
use crate::providers::{self, ProviderOverrides, ResolvedProvider};

/// Default prefix for the persisted index and chunk files
pub const DEFAULT_INDEX_PREFIX: &str = "university_combined";
/// Candidates requested from the index per query
pub const DEFAULT_TOP_K: usize = 20;
/// Minimum similarity score for a chunk to count as relevant
pub const DEFAULT_THRESHOLD: f32 = 0.65;
/// Pause between two requests to the same host while scraping
pub const DEFAULT_SCRAPE_DELAY_MS: u64 = 1500;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directories scanned recursively for PDFs
    pub pdf_dirs: Vec<PathBuf>,
    /// Newline-delimited list of URLs to scrape
    pub links_file: PathBuf,
    /// Where the index and chunk store are written
    pub index_dir: PathBuf,
    pub index_prefix: String,
    /// Append-only log of asked questions; `None` disables it
    pub prompt_log: Option<PathBuf>,
    pub pdf_chunks: ChunkSettings,
    pub web_chunks: ChunkSettings,
    pub top_k: usize,
    pub threshold: f32,
    pub scrape_delay: Duration,
    pub embed_batch_size: usize,
    /// Resolved generation provider
    pub llm: ResolvedProvider,
    /// Resolved embedding provider
    pub embedding: ResolvedProvider,
}

/// Values given on the command line; each wins over its env var
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub pdf_dirs: Vec<PathBuf>,
    pub links_file: Option<PathBuf>,
    pub index_dir: Option<PathBuf>,
    pub index_prefix: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub pdf_chunk_size: Option<usize>,
    pub pdf_chunk_overlap: Option<usize>,
    pub web_chunk_size: Option<usize>,
    pub web_chunk_overlap: Option<usize>,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub llm: ProviderOverrides,
    pub embedding: ProviderOverrides,
}

impl Config {
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let pdf_dirs = if !overrides.pdf_dirs.is_empty() {
            overrides.pdf_dirs.iter().map(|p| expand(p)).collect()
        } else {
            env_string("GRAIN_PDF_DIRS")
                .map(|dirs| {
                    std::env::split_paths(&dirs)
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(|p| expand(&p))
                        .collect()
                })
                .unwrap_or_else(|| vec![PathBuf::from("Data").join("PDFs")])
        };

        let links_file = path_setting(
            overrides.links_file.as_deref(),
            "GRAIN_LINKS_FILE",
            &Path::new("Data").join("Links.txt"),
        );
        let index_dir = path_setting(
            overrides.index_dir.as_deref(),
            "GRAIN_INDEX_DIR",
            Path::new("embeddings"),
        );
        let index_prefix = overrides
            .index_prefix
            .clone()
            .or_else(|| env_string("GRAIN_INDEX_PREFIX"))
            .unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_string());

        let prompt_log = match env_string("GRAIN_PROMPT_LOG") {
            Some(v) if v.eq_ignore_ascii_case("off") => None,
            Some(v) => Some(expand(Path::new(&v))),
            None => Some(PathBuf::from("logs").join("prompt_logs.txt")),
        };

        let chunk_size = setting(overrides.chunk_size, "GRAIN_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = setting(
            overrides.chunk_overlap,
            "GRAIN_CHUNK_OVERLAP",
            DEFAULT_CHUNK_OVERLAP,
        )?;
        let shared = ChunkSettings::new(chunk_size, chunk_overlap)?;
        let pdf_chunks = chunk_settings(
            "GRAIN_PDF",
            overrides.pdf_chunk_size,
            overrides.pdf_chunk_overlap,
            shared,
        )?;
        let web_chunks = chunk_settings(
            "GRAIN_WEB",
            overrides.web_chunk_size,
            overrides.web_chunk_overlap,
            shared,
        )?;

        let top_k = setting(overrides.top_k, "GRAIN_TOP_K", DEFAULT_TOP_K)?;
        let threshold = setting(overrides.threshold, "GRAIN_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !threshold.is_finite() {
            return Err(GrainError::Config("GRAIN_THRESHOLD must be finite".into()));
        }
        let scrape_delay_ms = setting(None, "GRAIN_SCRAPE_DELAY_MS", DEFAULT_SCRAPE_DELAY_MS)?;
        let embed_batch_size = setting(None, "GRAIN_EMBED_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;

        let llm_overrides = with_env(
            &overrides.llm,
            "GRAIN_LLM_PROVIDER",
            "GRAIN_LLM_ENDPOINT",
            "GRAIN_LLM_MODEL",
        );
        let llm = providers::resolve_llm(&llm_overrides)?;

        let embed_overrides = with_env(
            &overrides.embedding,
            "GRAIN_EMBED_PROVIDER",
            "GRAIN_EMBED_ENDPOINT",
            "GRAIN_EMBED_MODEL",
        );
        let embedding = providers::resolve_embedding(&embed_overrides, &llm)?;

        Ok(Config {
            pdf_dirs,
            links_file,
            index_dir,
            index_prefix,
            prompt_log,
            pdf_chunks,
            web_chunks,
            top_k,
            threshold,
            scrape_delay: Duration::from_millis(scrape_delay_ms),
            embed_batch_size,
            llm,
            embedding,
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn setting<T: FromStr>(explicit: Option<T>, env_name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    if let Some(value) = explicit {
        return Ok(value);
    }
    match env_string(env_name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| GrainError::Config(format!("{}='{}': {}", env_name, raw, e))),
        None => Ok(default),
    }
}

/// Settings for one source type: `{env_prefix}_CHUNK_SIZE` and
/// `{env_prefix}_CHUNK_OVERLAP`, each falling back to the shared value
fn chunk_settings(
    env_prefix: &str,
    size: Option<usize>,
    overlap: Option<usize>,
    shared: ChunkSettings,
) -> Result<ChunkSettings> {
    let size = setting(size, &format!("{}_CHUNK_SIZE", env_prefix), shared.size())?;
    let overlap = setting(
        overlap,
        &format!("{}_CHUNK_OVERLAP", env_prefix),
        shared.overlap(),
    )?;
    ChunkSettings::new(size, overlap)
}

fn path_setting(explicit: Option<&Path>, env_name: &str, default: &Path) -> PathBuf {
    match (explicit, env_string(env_name)) {
        (Some(path), _) => expand(path),
        (None, Some(raw)) => expand(Path::new(&raw)),
        (None, None) => default.to_path_buf(),
    }
}

/// Expand `~` and `$VAR` in a path, leaving it unchanged if expansion fails
fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

fn with_env(
    explicit: &ProviderOverrides,
    provider_var: &str,
    endpoint_var: &str,
    model_var: &str,
) -> ProviderOverrides {
    ProviderOverrides {
        provider: explicit.provider.clone().or_else(|| env_string(provider_var)),
        endpoint: explicit.endpoint.clone().or_else(|| env_string(endpoint_var)),
        model: explicit.model.clone().or_else(|| env_string(model_var)),
        api_key: explicit.api_key.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_setting_wins() {
        assert_eq!(setting(Some(5usize), "GRAIN_TEST_UNSET_VAR", 1).unwrap(), 5);
        assert_eq!(setting(None, "GRAIN_TEST_UNSET_VAR", 1usize).unwrap(), 1);
    }

    #[test]
    fn test_path_setting_prefers_explicit() {
        let p = path_setting(
            Some(Path::new("/tmp/pdfs")),
            "GRAIN_TEST_UNSET_PATH",
            Path::new("default"),
        );
        assert_eq!(p, PathBuf::from("/tmp/pdfs"));
        let d = path_setting(None, "GRAIN_TEST_UNSET_PATH", Path::new("default"));
        assert_eq!(d, PathBuf::from("default"));
    }

    #[test]
    fn test_expand_plain_path_unchanged() {
        assert_eq!(expand(Path::new("Data/PDFs")), PathBuf::from("Data/PDFs"));
    }

    #[test]
    fn test_load_with_overrides() {
        let overrides = ConfigOverrides {
            pdf_dirs: vec![PathBuf::from("pdfs")],
            links_file: Some(PathBuf::from("links.txt")),
            index_dir: Some(PathBuf::from("idx")),
            index_prefix: Some("test".into()),
            chunk_size: Some(400),
            chunk_overlap: Some(100),
            pdf_chunk_size: None,
            pdf_chunk_overlap: None,
            web_chunk_size: None,
            web_chunk_overlap: None,
            top_k: Some(7),
            threshold: Some(0.3),
            llm: ProviderOverrides {
                provider: Some("ollama".into()),
                ..Default::default()
            },
            embedding: ProviderOverrides::default(),
        };
        let config = Config::load(&overrides).unwrap();
        assert_eq!(config.pdf_dirs, vec![PathBuf::from("pdfs")]);
        assert_eq!(config.index_prefix, "test");
        assert_eq!(config.pdf_chunks.size(), 400);
        assert_eq!(config.web_chunks.overlap(), 100);
        assert_eq!(config.top_k, 7);
        assert_eq!(config.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn test_pdf_and_web_chunking_tuned_separately() {
        let overrides = ConfigOverrides {
            pdf_chunk_size: Some(500),
            pdf_chunk_overlap: Some(200),
            web_chunk_size: Some(600),
            web_chunk_overlap: Some(200),
            llm: ProviderOverrides {
                provider: Some("ollama".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = Config::load(&overrides).unwrap();
        assert_ne!(config.pdf_chunks, config.web_chunks);
        assert_eq!(config.pdf_chunks, ChunkSettings::new(500, 200).unwrap());
        assert_eq!(config.web_chunks, ChunkSettings::new(600, 200).unwrap());
    }

    #[test]
    fn test_source_chunking_falls_back_to_shared() {
        let shared = ChunkSettings::new(400, 100).unwrap();
        let web = chunk_settings("GRAIN_TEST_UNSET_WEB", Some(300), None, shared).unwrap();
        assert_eq!(web, ChunkSettings::new(300, 100).unwrap());
        let pdf = chunk_settings("GRAIN_TEST_UNSET_PDF", None, None, shared).unwrap();
        assert_eq!(pdf, shared);
        // Overlap inherited from the shared value must still fit the window
        assert!(chunk_settings("GRAIN_TEST_UNSET_PDF", Some(100), None, shared).is_err());
    }

    #[test]
    fn test_load_rejects_bad_chunking() {
        let overrides = ConfigOverrides {
            chunk_size: Some(100),
            chunk_overlap: Some(100),
            llm: ProviderOverrides {
                provider: Some("ollama".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            Config::load(&overrides),
            Err(GrainError::Config(_))
        ));
    }
}
