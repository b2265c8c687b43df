use std::fmt;

use crate::error::{GrainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAI,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[
            Provider::Gemini,
            Provider::OpenAI,
            Provider::Anthropic,
            Provider::Ollama,
        ]
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash-lite",
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Anthropic => "claude-sonnet-4-5-20250929",
            Provider::Ollama => "gemma3:4b",
        }
    }

    /// Default embedding model, or `None` when the provider has no embeddings API
    pub fn default_embedding_model(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some("text-embedding-004"),
            Provider::OpenAI => Some("text-embedding-3-small"),
            Provider::Ollama => Some("nomic-embed-text"),
            Provider::Anthropic => None,
        }
    }

    pub fn supports_embeddings(&self) -> bool {
        self.default_embedding_model().is_some()
    }

    pub fn requires_auth(&self) -> bool {
        match self {
            Provider::Gemini | Provider::OpenAI | Provider::Anthropic => true,
            Provider::Ollama => false,
        }
    }

    /// Env vars checked for an API key, in order
    pub fn env_var_names(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            Provider::OpenAI => &["OPENAI_API_KEY"],
            Provider::Anthropic => &["ANTHROPIC_API_KEY"],
            Provider::Ollama => &[],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic (Claude)",
            Provider::Ollama => "Ollama (local)",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Provider> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Provider::Gemini),
            "openai" | "gpt" => Some(Provider::OpenAI),
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "ollama" | "local" => Some(Provider::Ollama),
            _ => None,
        }
    }

    fn key_from_env(&self) -> Option<String> {
        self.env_var_names()
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAI => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

/// A fully resolved provider configuration, ready to build a client from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub provider: Provider,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl ResolvedProvider {
    /// Endpoint without a trailing slash, ready for path joins
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// Fail early when a cloud provider has no key
    pub fn require_key(&self) -> Result<Option<&str>> {
        if self.provider.requires_auth() && self.api_key.is_none() {
            return Err(GrainError::Config(format!(
                "No API key found for {}. Set {} or pass --api-key",
                self.provider.display_name(),
                self.provider.env_var_names().join(" or ")
            )));
        }
        Ok(self.api_key.as_deref())
    }

    /// Identity recorded in the index so query-time embeddings can be checked
    pub fn model_id(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

/// Overrides that take precedence over environment detection
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// Resolve the generation provider:
/// explicit override > detected key in env > Ollama fallback
pub fn resolve_llm(overrides: &ProviderOverrides) -> Result<ResolvedProvider> {
    let provider = match overrides.provider.as_deref() {
        Some(name) => parse_provider(name)?,
        None => detect_from_env().unwrap_or(Provider::Ollama),
    };

    Ok(ResolvedProvider {
        provider,
        endpoint: overrides
            .endpoint
            .clone()
            .unwrap_or_else(|| provider.default_endpoint().to_string()),
        model: overrides
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string()),
        api_key: overrides.api_key.clone().or_else(|| provider.key_from_env()),
    })
}

/// Resolve the embedding provider. Without an explicit choice it follows the
/// generation provider, dropping to Ollama when that provider cannot embed.
pub fn resolve_embedding(
    overrides: &ProviderOverrides,
    llm: &ResolvedProvider,
) -> Result<ResolvedProvider> {
    let provider = match overrides.provider.as_deref() {
        Some(name) => parse_provider(name)?,
        None if llm.provider.supports_embeddings() => llm.provider,
        None => Provider::Ollama,
    };

    let model = match overrides.model.clone() {
        Some(model) => model,
        None => provider
            .default_embedding_model()
            .ok_or_else(|| {
                GrainError::Config(format!(
                    "{} has no embeddings API; choose another embedding provider",
                    provider.display_name()
                ))
            })?
            .to_string(),
    };

    let endpoint = overrides.endpoint.clone().unwrap_or_else(|| {
        if provider == llm.provider {
            llm.endpoint.clone()
        } else {
            provider.default_endpoint().to_string()
        }
    });

    let api_key = overrides.api_key.clone().or_else(|| {
        if provider == llm.provider {
            llm.api_key.clone()
        } else {
            provider.key_from_env()
        }
    });

    Ok(ResolvedProvider {
        provider,
        endpoint,
        model,
        api_key,
    })
}

fn parse_provider(name: &str) -> Result<Provider> {
    Provider::from_str_loose(name)
        .ok_or_else(|| GrainError::Config(format!("Unknown provider: {}", name)))
}

/// First provider whose key is present in the environment
fn detect_from_env() -> Option<Provider> {
    [Provider::Gemini, Provider::OpenAI, Provider::Anthropic]
        .into_iter()
        .find(|p| p.key_from_env().is_some())
}
