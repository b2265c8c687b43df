use std::time::Duration;

use indicatif::ProgressBar;
use serde::Deserialize;

use super::normalize;
use crate::error::{GrainError, Result};
use crate::providers::{Provider, ResolvedProvider};

pub const DEFAULT_BATCH_SIZE: usize = 32;
const REQUEST_TIMEOUT_SECONDS: u64 = 120;

/// Sentence-embedding model behind one of the hosted (or local) APIs.
/// Output vectors are always unit length.
pub struct EmbeddingProvider {
    config: ResolvedProvider,
    client: reqwest::Client,
    batch_size: usize,
}

impl EmbeddingProvider {
    pub fn new(resolved: &ResolvedProvider, batch_size: usize) -> Result<Self> {
        if !resolved.provider.supports_embeddings() {
            return Err(GrainError::Config(format!(
                "{} does not offer an embeddings API",
                resolved.provider.display_name()
            )));
        }
        resolved.require_key()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            config: resolved.clone(),
            client,
            batch_size: batch_size.max(1),
        })
    }

    /// `provider:model`, recorded in the index and checked at query time
    pub fn model_id(&self) -> String {
        self.config.model_id()
    }

    /// Generate embeddings for a batch of texts, one vector per text in order
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_all(texts, &ProgressBar::hidden()).await
    }

    /// Like `embed_batch`, advancing `progress` once per text
    pub async fn embed_all(&self, texts: &[String], progress: &ProgressBar) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            tracing::debug!("Embedding batch of {} texts with {}", batch.len(), self.model_id());
            let raw = match self.config.provider {
                Provider::Gemini => self.embed_gemini(batch).await?,
                Provider::OpenAI => self.embed_openai(batch).await?,
                Provider::Ollama => self.embed_ollama(batch).await?,
                Provider::Anthropic => {
                    return Err(GrainError::Config("Anthropic cannot embed text".into()))
                }
            };

            if raw.len() != batch.len() {
                return Err(GrainError::Embedding(format!(
                    "{} returned {} vectors for {} texts",
                    self.model_id(),
                    raw.len(),
                    batch.len()
                )));
            }

            vectors.extend(raw.into_iter().map(normalize));
            progress.inc(batch.len() as u64);
        }

        check_dimensions(&vectors)?;
        Ok(vectors)
    }

    /// Generate embedding for single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| GrainError::Embedding("No embedding returned".into()))
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<reqwest::Response> {
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            req = match self.config.provider {
                Provider::Gemini => req.header("x-goog-api-key", key),
                _ => req.header("Authorization", format!("Bearer {}", key)),
            };
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GrainError::Embedding(format!(
                "{} API returned {}: {}",
                self.config.provider.display_name(),
                status,
                text
            )));
        }
        Ok(response)
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            #[serde(default)]
            index: usize,
            embedding: Vec<f32>,
        }

        let response = self
            .post(
                format!("{}/embeddings", self.config.base_url()),
                serde_json::json!({
                    "model": self.config.model,
                    "input": texts,
                }),
            )
            .await?;

        let mut result: EmbeddingResponse = response.json().await?;
        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn embed_gemini(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Deserialize)]
        struct BatchResponse {
            embeddings: Vec<ContentEmbedding>,
        }

        #[derive(Deserialize)]
        struct ContentEmbedding {
            values: Vec<f32>,
        }

        let model = format!("models/{}", self.config.model);
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let response = self
            .post(
                format!("{}/{}:batchEmbedContents", self.config.base_url(), model),
                serde_json::json!({ "requests": requests }),
            )
            .await?;

        let result: BatchResponse = response.json().await?;
        Ok(result.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Deserialize)]
        struct BatchEmbedResponse {
            embeddings: Vec<Vec<f32>>,
        }

        let response = self
            .post(
                format!("{}/api/embed", self.config.base_url()),
                serde_json::json!({
                    "model": self.config.model,
                    "input": texts,
                }),
            )
            .await?;

        let result: BatchEmbedResponse = response.json().await?;
        Ok(result.embeddings)
    }
}

fn check_dimensions(vectors: &[Vec<f32>]) -> Result<()> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    if first.is_empty() {
        return Err(GrainError::Embedding("model returned empty vectors".into()));
    }
    if vectors.iter().any(|v| v.len() != first.len()) {
        return Err(GrainError::Embedding(
            "model returned vectors of differing dimensions".into(),
        ));
    }
    Ok(())
}
