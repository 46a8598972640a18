use thiserror::Error;

use crate::config::QdrantSettings;
use crate::database::memory::MemoryStore;
use crate::database::vector_db::{IndexEntry, QdrantStore, ScoredChunk, VectorDBError, VectorStore};
use crate::document::Chunk;
use crate::llm::Embedder;

#[derive(Error, Debug)]
pub enum IndexBuildError {
    #[error("No chunks to index")]
    NoChunks,
    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("Embedder returned {got} vectors for {expected} chunks")]
    VectorCount { expected: usize, got: usize },
    #[error("Chunk {index} was embedded to an empty vector")]
    EmptyVector { index: usize },
    #[error("Chunk {index} has dimension {got}, expected {expected}")]
    InconsistentDimension { index: usize, expected: usize, got: usize },
    #[error("Vector store error: {0}")]
    Store(#[from] VectorDBError),
}

/// Where built entries are kept.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory,
    Qdrant(QdrantSettings),
}

/// Write-once chunk index. A value of this type always holds every chunk it
/// was built from.
pub struct VectorIndex {
    store: Box<dyn VectorStore>,
    embedding_model: String,
    dimension: usize,
}

impl VectorIndex {
    /// Embed every chunk and load the entries into `backend`. Nothing is
    /// stored unless every chunk embedded cleanly.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        backend: &StoreBackend,
    ) -> Result<Self, IndexBuildError> {
        if chunks.is_empty() {
            return Err(IndexBuildError::NoChunks);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .generate_batch_embeddings(&texts)
            .await
            .map_err(IndexBuildError::Embedding)?;

        if vectors.len() != chunks.len() {
            return Err(IndexBuildError::VectorCount {
                expected: chunks.len(),
                got: vectors.len(),
            });
        }

        let dimension = vectors[0].len();
        for (chunk, vector) in chunks.iter().zip(&vectors) {
            if vector.is_empty() {
                return Err(IndexBuildError::EmptyVector { index: chunk.index });
            }
            if vector.len() != dimension {
                return Err(IndexBuildError::InconsistentDimension {
                    index: chunk.index,
                    expected: dimension,
                    got: vector.len(),
                });
            }
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        let count = entries.len();

        let store: Box<dyn VectorStore> = match backend {
            StoreBackend::Memory => Box::new(MemoryStore::new(entries)),
            StoreBackend::Qdrant(settings) => {
                Box::new(QdrantStore::create(&settings.url, &settings.collection_prefix, entries).await?)
            }
        };

        log::info!(
            "Indexed {} chunks ({} dimensions, model {})",
            count,
            dimension,
            embedder.model_name()
        );

        Ok(Self {
            store,
            embedding_model: embedder.model_name().to_string(),
            dimension,
        })
    }

    pub async fn retrieve(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorDBError> {
        if query.len() != self.dimension {
            return Err(VectorDBError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        self.store.search(query, k).await
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Release the backing store. Searches after this may fail.
    pub async fn close(&self) -> Result<(), VectorDBError> {
        self.store.close().await
    }
}
