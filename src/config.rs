use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::document::{ChunkConfig, ChunkConfigError, LoadError, TextEncoding};

pub const DEFAULT_SOURCE_PATH: &str = "./output.txt";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Missing API key: set {0}")]
    MissingApiKey(String),
    #[error("Provider {0} needs an API URL: set {1}")]
    MissingApiUrl(String, String),
    #[error("Invalid chunking: {0}")]
    Chunking(#[from] ChunkConfigError),
    #[error(transparent)]
    Encoding(#[from] LoadError),
}

/// Language model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAI,
    DeepSeek,
    OpenRouter,
    /// Any OpenAI-compatible endpoint given by `GATEWAY_API_URL`.
    Gateway,
    Echo,
}

impl LlmProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            LlmProviderKind::OpenAI => "openai",
            LlmProviderKind::DeepSeek => "deepseek",
            LlmProviderKind::OpenRouter => "openrouter",
            LlmProviderKind::Gateway => "gateway",
            LlmProviderKind::Echo => "echo",
        }
    }
}

impl FromStr for LlmProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAI),
            "deepseek" => Ok(LlmProviderKind::DeepSeek),
            "openrouter" => Ok(LlmProviderKind::OpenRouter),
            "gateway" => Ok(LlmProviderKind::Gateway),
            "echo" => Ok(LlmProviderKind::Echo),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    OpenAI,
    /// Offline hashed bag-of-words vectors.
    Lexical,
}

impl FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProviderKind::OpenAI),
            "lexical" | "local" => Ok(EmbeddingProviderKind::Lexical),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStoreKind {
    Memory,
    Qdrant,
}

impl FromStr for VectorStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(VectorStoreKind::Memory),
            "qdrant" => Ok(VectorStoreKind::Qdrant),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Settings for one chat-completion backend, read from `{PROVIDER}_*` variables.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: LlmProviderKind) -> Result<Self, ConfigError> {
        Self::from_lookup(provider, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(provider: LlmProviderKind, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = provider.name().to_uppercase();

        let model = lookup(&format!("{}_MODEL", prefix))
            .unwrap_or_else(|| match provider {
                LlmProviderKind::OpenAI | LlmProviderKind::Gateway => "gpt-3.5-turbo".to_string(),
                LlmProviderKind::DeepSeek => "deepseek-chat".to_string(),
                LlmProviderKind::OpenRouter => "openai/gpt-3.5-turbo".to_string(),
                LlmProviderKind::Echo => "echo".to_string(),
            });

        let api_url = lookup(&format!("{}_API_URL", prefix))
            .or_else(|| match provider {
                LlmProviderKind::DeepSeek => Some("https://api.deepseek.com/v1".to_string()),
                LlmProviderKind::OpenRouter => Some("https://openrouter.ai/api/v1".to_string()),
                _ => None,
            });

        let api_key = lookup(&format!("{}_API_KEY", prefix)).filter(|k| !k.trim().is_empty());

        let temperature = parse_or(&lookup, &format!("{}_TEMPERATURE", prefix), 0.7)?;

        Ok(Self {
            model,
            api_url,
            api_key,
            temperature,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    /// Only used by the lexical embedder.
    pub dimensions: usize,
}

#[derive(Debug, Clone)]
pub struct QdrantSettings {
    pub url: String,
    pub collection_prefix: String,
}

/// Everything needed to build and serve the question-answering pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source_path: PathBuf,
    pub encoding: TextEncoding,
    pub chunk: ChunkConfig,
    pub top_k: usize,
    pub prompt_template: Option<PathBuf>,
    pub system_message: String,
    pub return_sources: bool,
    pub cors_origins: Vec<String>,
    pub llm_provider: LlmProviderKind,
    pub llm: ProviderConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreKind,
    pub qdrant: QdrantSettings,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_path = lookup("DOCQA_SOURCE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_PATH));

        let encoding = match lookup("DOCQA_ENCODING") {
            Some(label) => label.parse()?,
            None => TextEncoding::default(),
        };

        let chunk = ChunkConfig::new(
            parse_or(&lookup, "DOCQA_CHUNK_SIZE", crate::document::DEFAULT_CHUNK_SIZE)?,
            parse_or(&lookup, "DOCQA_CHUNK_OVERLAP", crate::document::DEFAULT_CHUNK_OVERLAP)?,
        )?;

        let top_k = parse_or(&lookup, "DOCQA_TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DOCQA_TOP_K".to_string(),
                value: "0".to_string(),
            });
        }

        let llm_provider = match lookup("DOCQA_LLM_PROVIDER") {
            Some(name) => name.parse()?,
            None => LlmProviderKind::OpenAI,
        };
        let llm = ProviderConfig::from_lookup(llm_provider, &lookup)?;

        let embedding_provider = match lookup("DOCQA_EMBEDDING_PROVIDER") {
            Some(name) => name.parse()?,
            None => EmbeddingProviderKind::OpenAI,
        };
        let embedding = EmbeddingConfig {
            provider: embedding_provider,
            model: lookup("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            batch_size: parse_or(&lookup, "DOCQA_EMBEDDING_BATCH_SIZE", 64)?.max(1),
            dimensions: parse_or(&lookup, "DOCQA_LEXICAL_DIMENSIONS", 256)?,
        };

        let vector_store = match lookup("DOCQA_VECTOR_STORE") {
            Some(name) => name.parse()?,
            None => VectorStoreKind::Memory,
        };

        let cors_origins: Vec<String> = lookup("DOCQA_CORS_ORIGINS")
            .map(|o| {
                o.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]);
        // Credentialed CORS needs explicit origins.
        if let Some(wildcard) = cors_origins.iter().find(|o| o.contains('*')) {
            return Err(ConfigError::InvalidValue {
                key: "DOCQA_CORS_ORIGINS".to_string(),
                value: wildcard.clone(),
            });
        }

        Ok(Self {
            source_path,
            encoding,
            chunk,
            top_k,
            prompt_template: lookup("DOCQA_PROMPT_TEMPLATE").map(PathBuf::from),
            system_message: lookup("DOCQA_SYSTEM_MESSAGE")
                .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
            return_sources: parse_or(&lookup, "DOCQA_RETURN_SOURCES", false)?,
            cors_origins,
            llm_provider,
            llm,
            embedding,
            vector_store,
            qdrant: QdrantSettings {
                url: lookup("QDRANT_URL").unwrap_or_else(|| "http://localhost:6333".to_string()),
                collection_prefix: lookup("DOCQA_QDRANT_COLLECTION_PREFIX")
                    .unwrap_or_else(|| "docqa".to_string()),
            },
            request_timeout: Duration::from_secs(parse_or(&lookup, "DOCQA_REQUEST_TIMEOUT_SECS", 60)?),
        })
    }

    /// Switch the language model backend to `provider` with its settings.
    pub fn with_llm_provider(mut self, provider: LlmProviderKind, settings: ProviderConfig) -> Self {
        self.llm_provider = provider;
        self.llm = settings;
        self
    }

    /// Use `api_key` for the language model. An OpenAI key also serves
    /// OpenAI embeddings.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        if self.llm_provider == LlmProviderKind::OpenAI
            && self.embedding.provider == EmbeddingProviderKind::OpenAI
        {
            self.embedding.api_key = Some(api_key.clone());
        }
        self.llm.api_key = Some(api_key);
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.source_path, PathBuf::from(DEFAULT_SOURCE_PATH));
        assert_eq!(config.chunk.size(), 1024);
        assert_eq!(config.chunk.overlap(), 128);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.llm_provider, LlmProviderKind::OpenAI);
        assert_eq!(config.vector_store, VectorStoreKind::Memory);
        assert_eq!(config.cors_origins, vec![DEFAULT_CORS_ORIGIN.to_string()]);
        assert!(!config.return_sources);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOCQA_SOURCE_PATH", "/data/faq.txt"),
            ("DOCQA_CHUNK_SIZE", "200"),
            ("DOCQA_CHUNK_OVERLAP", "20"),
            ("DOCQA_LLM_PROVIDER", "deepseek"),
            ("DEEPSEEK_API_KEY", "sk-test"),
            ("DOCQA_EMBEDDING_PROVIDER", "lexical"),
            ("DOCQA_RETURN_SOURCES", "true"),
            ("DOCQA_CORS_ORIGINS", "http://localhost, http://localhost:3000"),
        ]))
        .unwrap();

        assert_eq!(config.source_path, PathBuf::from("/data/faq.txt"));
        assert_eq!(config.chunk.size(), 200);
        assert_eq!(config.llm_provider, LlmProviderKind::DeepSeek);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.api_url.as_deref(), Some("https://api.deepseek.com/v1"));
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Lexical);
        assert!(config.return_sources);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DOCQA_CHUNK_SIZE", "100"),
            ("DOCQA_CHUNK_OVERLAP", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Chunking(ChunkConfigError::OverlapTooLarge { .. })));
    }

    #[test]
    fn test_bad_number_and_unknown_provider() {
        let err = AppConfig::from_lookup(lookup_from(&[("DOCQA_TOP_K", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("DOCQA_TOP_K", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("DOCQA_LLM_PROVIDER", "vercel")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(_)));
    }

    #[test]
    fn test_provider_temperature() {
        let config = ProviderConfig::from_lookup(LlmProviderKind::OpenRouter, lookup_from(&[])).unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.api_url.as_deref(), Some("https://openrouter.ai/api/v1"));

        let config = ProviderConfig::from_lookup(
            LlmProviderKind::OpenRouter,
            lookup_from(&[("OPENROUTER_TEMPERATURE", "0.2")]),
        )
        .unwrap();
        assert_eq!(config.temperature, 0.2);

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DOCQA_LLM_PROVIDER", "openrouter"),
            ("OPENROUTER_TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "OPENROUTER_TEMPERATURE"));
    }

    #[test]
    fn test_wildcard_cors_origin_is_rejected() {
        for origins in ["*", "http://localhost, *", "https://*.example.com"] {
            let err = AppConfig::from_lookup(lookup_from(&[("DOCQA_CORS_ORIGINS", origins)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "DOCQA_CORS_ORIGINS"));
        }
    }

    #[test]
    fn test_switch_provider_uses_given_settings() {
        let lookup = lookup_from(&[("GATEWAY_API_URL", "http://localhost:1337/v1"), ("GATEWAY_MODEL", "llama3")]);
        let settings = ProviderConfig::from_lookup(LlmProviderKind::Gateway, &lookup).unwrap();
        let config = AppConfig::from_lookup(lookup_from(&[]))
            .unwrap()
            .with_llm_provider(LlmProviderKind::Gateway, settings);

        assert_eq!(config.llm_provider, LlmProviderKind::Gateway);
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.api_url.as_deref(), Some("http://localhost:1337/v1"));
    }

    #[test]
    fn test_openai_key_also_covers_openai_embeddings() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap().with_api_key("sk-cli");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-cli"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-cli"));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOCQA_LLM_PROVIDER", "deepseek"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]))
        .unwrap()
        .with_api_key("sk-deepseek");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-deepseek"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-openai"));
    }
}
