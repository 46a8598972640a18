use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, ConfigError, EmbeddingConfig, VectorStoreKind};
use crate::database::{IndexBuildError, StoreBackend, VectorIndex};
use crate::document::{load_document, ChunkConfig, Chunker, LoadError, TextEncoding};
use crate::llm::{create_embedder, AnswerGenerator, Embedder, PromptTemplate, TemplateError};
use crate::providers::create_provider;
use crate::providers::traits::CompletionProvider;
use crate::service::lifecycle::LifecycleError;
use crate::service::QAService;

/// Anything that stops the pipeline from becoming ready.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("No {0} configured")]
    MissingComponent(&'static str),
    #[error("Prompt template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Failed to load document: {0}")]
    Load(#[from] LoadError),
    #[error("Source document {} has no content", .0.display())]
    EmptyCorpus(PathBuf),
    #[error("Failed to build vector index: {0}")]
    Index(#[from] IndexBuildError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Collects the configuration and collaborators for a [`QAService`].
///
/// Collaborators not given explicitly are created from the [`AppConfig`]
/// during [`build`](Self::build), so provider misconfiguration surfaces as an
/// initialization failure.
#[derive(Clone)]
pub struct QAServiceBuilder {
    source_path: PathBuf,
    encoding: TextEncoding,
    chunk_config: ChunkConfig,
    top_k: usize,
    return_sources: bool,
    template: PromptTemplate,
    template_path: Option<PathBuf>,
    backend: StoreBackend,
    embedder: Option<Arc<dyn Embedder>>,
    provider: Option<Arc<dyn CompletionProvider>>,
    embedding_config: Option<EmbeddingConfig>,
    app_config: Option<AppConfig>,
}

impl QAServiceBuilder {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            encoding: TextEncoding::default(),
            chunk_config: ChunkConfig::default(),
            top_k: crate::config::DEFAULT_TOP_K,
            return_sources: false,
            template: PromptTemplate::default(),
            template_path: None,
            backend: StoreBackend::Memory,
            embedder: None,
            provider: None,
            embedding_config: None,
            app_config: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let backend = match config.vector_store {
            VectorStoreKind::Memory => StoreBackend::Memory,
            VectorStoreKind::Qdrant => StoreBackend::Qdrant(config.qdrant.clone()),
        };

        Self {
            encoding: config.encoding,
            chunk_config: config.chunk,
            top_k: config.top_k,
            return_sources: config.return_sources,
            template_path: config.prompt_template.clone(),
            backend,
            embedding_config: Some(config.embedding.clone()),
            app_config: Some(config.clone()),
            ..Self::new(config.source_path.clone())
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn chunk_config(mut self, chunk_config: ChunkConfig) -> Self {
        self.chunk_config = chunk_config;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn return_sources(mut self, return_sources: bool) -> Self {
        self.return_sources = return_sources;
        self
    }

    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self.template_path = None;
        self
    }

    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Load, chunk, embed and index the source document.
    pub async fn build(self) -> Result<QAService, InitError> {
        let embedder = match (self.embedder, &self.embedding_config) {
            (Some(embedder), _) => embedder,
            (None, Some(config)) => create_embedder(config)?,
            (None, None) => return Err(InitError::MissingComponent("embedder")),
        };
        let provider = match (self.provider, &self.app_config) {
            (Some(provider), _) => provider,
            (None, Some(config)) => create_provider(config)?,
            (None, None) => return Err(InitError::MissingComponent("language model")),
        };
        let template = match &self.template_path {
            Some(path) => PromptTemplate::from_file(path).await?,
            None => self.template,
        };

        let document = load_document(&self.source_path, self.encoding).await?;
        if document.is_blank() {
            return Err(InitError::EmptyCorpus(self.source_path));
        }

        let chunks = Chunker::new(self.chunk_config).split(&document);
        log::info!(
            "Split {} into {} chunks (size {}, overlap {})",
            self.source_path.display(),
            chunks.len(),
            self.chunk_config.size(),
            self.chunk_config.overlap()
        );

        let index = VectorIndex::build(chunks, embedder.as_ref(), &self.backend).await?;

        Ok(QAService::new(
            index,
            embedder,
            AnswerGenerator::new(provider, template),
            self.top_k.max(1),
            self.return_sources,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LexicalEmbedder;
    use crate::providers::echo::EchoProvider;
    use std::io::Write;

    fn corpus(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn offline(path: &Path) -> QAServiceBuilder {
        QAServiceBuilder::new(path)
            .embedder(Arc::new(LexicalEmbedder::default()))
            .provider(Arc::new(EchoProvider::default()))
    }

    #[tokio::test]
    async fn test_missing_collaborators() {
        let file = corpus("text");
        let err = QAServiceBuilder::new(file.path()).build().await.err().unwrap();
        assert!(matches!(err, InitError::MissingComponent("embedder")));

        let err = QAServiceBuilder::new(file.path())
            .embedder(Arc::new(LexicalEmbedder::default()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, InitError::MissingComponent("language model")));
    }

    #[tokio::test]
    async fn test_blank_corpus_is_empty() {
        let file = corpus(" \n\t\n");
        let err = offline(file.path()).build().await.err().unwrap();
        assert!(matches!(err, InitError::EmptyCorpus(_)));
    }

    #[tokio::test]
    async fn test_missing_source_is_load_error() {
        let err = offline(Path::new("/no/such/output.txt")).build().await.err().unwrap();
        assert!(matches!(err, InitError::Load(LoadError::Read { .. })));
    }

    #[tokio::test]
    async fn test_builds_chunks_with_config() {
        let file = corpus(&"abcdefghij".repeat(10));
        let service = offline(file.path())
            .chunk_config(ChunkConfig::new(30, 10).unwrap())
            .top_k(2)
            .build()
            .await
            .unwrap();
        // 100 chars, step 20: windows start at 0, 20, 40, 60 and 80.
        assert_eq!(service.chunk_count(), 5);
        assert_eq!(service.top_k(), 2);
        assert_eq!(service.embedding_model(), "lexical-256");
    }

    #[tokio::test]
    async fn test_template_file_problems_fail_init() {
        let file = corpus("content");
        let template = corpus("no placeholders here");
        let mut builder = offline(file.path());
        builder.template_path = Some(template.path().to_path_buf());
        let err = builder.build().await.err().unwrap();
        assert!(matches!(err, InitError::Template(TemplateError::MissingPlaceholder(_))));
    }
}
