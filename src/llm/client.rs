use std::time::Duration;

use crate::error::{GrainError, Result};
use crate::providers::{Provider, ResolvedProvider};

const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.3;
const TOP_P: f32 = 0.9;
const TOP_K: u32 = 40;

/// Multi-provider LLM client
pub struct LlmClient {
    provider: Provider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(resolved: &ResolvedProvider) -> Result<Self> {
        resolved.require_key()?;
        Ok(Self {
            provider: resolved.provider,
            endpoint: resolved.base_url().to_string(),
            model: resolved.model.clone(),
            api_key: resolved.api_key.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request and return the response text.
    /// Every failure comes back as `GrainError::Generation`.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let (url, body) = match self.provider {
            Provider::Gemini => self.gemini_request(system, user),
            Provider::Anthropic => self.anthropic_request(system, user),
            Provider::OpenAI | Provider::Ollama => self.openai_compat_request(system, user),
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = match self.provider {
                Provider::Gemini => req.header("x-goog-api-key", key),
                Provider::Anthropic => req
                    .header("x-api-key", key)
                    .header("anthropic-version", "2023-06-01"),
                Provider::OpenAI | Provider::Ollama => {
                    req.header("Authorization", format!("Bearer {}", key))
                }
            };
        }

        let response = req.send().await.map_err(|e| {
            GrainError::Generation(format!(
                "request to {} failed: {}",
                self.provider.display_name(),
                e
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GrainError::Generation(format!(
                "{} returned {}: {}",
                self.provider.display_name(),
                status,
                text
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            GrainError::Generation(format!(
                "unreadable response from {}: {}",
                self.provider.display_name(),
                e
            ))
        })?;

        match self.provider {
            Provider::Gemini => gemini_text(&json),
            Provider::Anthropic => anthropic_text(&json),
            Provider::OpenAI | Provider::Ollama => openai_text(&json),
        }
    }

    /// Gemini generateContent API
    fn gemini_request(&self, system: &str, user: &str) -> (String, serde_json::Value) {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let safety: Vec<serde_json::Value> = [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .iter()
        .map(|category| {
            serde_json::json!({ "category": category, "threshold": "BLOCK_MEDIUM_AND_ABOVE" })
        })
        .collect();

        let body = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [
                { "role": "user", "parts": [{ "text": user }] },
            ],
            "safetySettings": safety,
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topP": TOP_P,
                "topK": TOP_K,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
        });
        (url, body)
    }

    /// Anthropic Messages API
    fn anthropic_request(&self, system: &str, user: &str) -> (String, serde_json::Value) {
        let url = format!("{}/v1/messages", self.endpoint);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "system": system,
            "messages": [
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
        });
        (url, body)
    }

    /// OpenAI-compatible API (OpenAI, Ollama, etc.)
    fn openai_compat_request(&self, system: &str, user: &str) -> (String, serde_json::Value) {
        let url = match self.provider {
            Provider::Ollama => format!("{}/v1/chat/completions", self.endpoint),
            _ => format!("{}/chat/completions", self.endpoint),
        };
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
            "top_p": TOP_P,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });
        (url, body)
    }
}

fn gemini_text(json: &serde_json::Value) -> Result<String> {
    if let Some(reason) = json
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(GrainError::Generation(format!(
            "Gemini blocked the prompt: {}",
            reason
        )));
    }

    let text: String = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    non_empty(text)
}

fn anthropic_text(json: &serde_json::Value) -> Result<String> {
    let text = json
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();
    non_empty(text)
}

fn openai_text(json: &serde_json::Value) -> Result<String> {
    let text = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();
    non_empty(text)
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(GrainError::Generation("LLM returned empty response".into()));
    }
    Ok(text)
}
