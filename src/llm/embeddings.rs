use anyhow::{Result, anyhow};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::config::{ConfigError, EmbeddingConfig, EmbeddingProviderKind};

/// Maps text to a dense vector. Indexing and querying must share one instance.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model, recorded by the index it builds.
    fn model_name(&self) -> &str;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;

    async fn generate_batch_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        stream::iter(texts)
            .then(|text| self.generate_embedding(text))
            .try_collect()
            .await
    }
}

/// OpenAI embeddings API.
#[derive(Clone)]
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    batch_size: usize,
}

impl OpenAIEmbedder {
    pub fn new(api_key: String, model: String, batch_size: usize) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_request(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(batch.to_vec()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;
        if response.data.len() != batch.len() {
            return Err(anyhow!(
                "Embedding API returned {} vectors for {} inputs",
                response.data.len(),
                batch.len()
            ));
        }

        let mut data = response.data;
        data.sort_by_key(|embedding| embedding.index);
        Ok(data.into_iter().map(|embedding| embedding.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_request(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| anyhow!("No embedding returned from OpenAI"))
    }

    async fn generate_batch_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_request(batch).await?);
            log::debug!("Embedded {}/{} texts", embeddings.len(), texts.len());
        }
        Ok(embeddings)
    }
}

/// Offline embedder: hashed, L2-normalised bag of words.
///
/// ASCII words are lowercased tokens; every other alphanumeric character
/// (CJK and friends) is a token of its own.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
    model: String,
}

impl LexicalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: format!("lexical-{}", dimensions),
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let bucket = (fnv1a(&token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for LexicalEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            word.push(ch.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if !ch.is_ascii() && ch.is_alphanumeric() {
            tokens.push(ch.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

/// Build the configured embedder.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ConfigError> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProviderKind::OpenAI => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingApiKey("OPENAI_API_KEY".to_string()))?;
            Arc::new(OpenAIEmbedder::new(api_key, config.model.clone(), config.batch_size))
        }
        EmbeddingProviderKind::Lexical => Arc::new(LexicalEmbedder::new(config.dimensions)),
    };
    log::info!("Using embedding model {}", embedder.model_name());
    Ok(embedder)
}
