//! The question-answering pipeline as one immutable value.
//!
//! [`QAServiceBuilder`] loads, chunks, embeds and indexes the source document
//! exactly once; the resulting [`QAService`] is cheap to clone and is shared
//! by every request. [`ServiceLifecycle`] tracks whether that value exists yet.

mod builder;
mod lifecycle;

pub use builder::{InitError, QAServiceBuilder};
pub use lifecycle::{AskError, LifecycleError, ServiceLifecycle, ServiceState};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::database::{ScoredChunk, VectorIndex};
use crate::llm::{AnswerError, AnswerGenerator, Embedder};

/// A generated answer and the chunks it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub query: String,
    pub result: String,
    pub sources: Vec<ScoredChunk>,
}

struct Pipeline {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    generator: AnswerGenerator,
    top_k: usize,
    return_sources: bool,
}

#[derive(Clone)]
pub struct QAService {
    inner: Arc<Pipeline>,
}

impl fmt::Debug for QAService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QAService")
            .field("chunks", &self.chunk_count())
            .field("embedding_model", &self.embedding_model())
            .field("top_k", &self.inner.top_k)
            .finish()
    }
}

impl QAService {
    pub(crate) fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        generator: AnswerGenerator,
        top_k: usize,
        return_sources: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Pipeline {
                index,
                embedder,
                generator,
                top_k,
                return_sources,
            }),
        }
    }

    /// Embed the question with the indexing embedder, retrieve the top-k
    /// chunks and generate an answer from them.
    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let pipeline = &self.inner;
        let query = pipeline
            .embedder
            .generate_embedding(question)
            .await
            .map_err(AnswerError::Embedding)?;

        let sources = pipeline.index.retrieve(&query, pipeline.top_k).await?;
        if sources.is_empty() {
            return Err(AnswerError::NoContext);
        }
        log::debug!(
            "Retrieved chunks {:?} for {:?}",
            sources.iter().map(|s| s.chunk.index).collect::<Vec<_>>(),
            question
        );

        let result = pipeline.generator.generate(question, &sources).await?;

        Ok(Answer {
            query: question.to_string(),
            result,
            sources,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.index.len()
    }

    pub fn embedding_model(&self) -> &str {
        self.inner.index.embedding_model()
    }

    pub fn top_k(&self) -> usize {
        self.inner.top_k
    }

    /// Drop external index resources such as a Qdrant collection.
    pub async fn close(&self) -> Result<(), crate::database::VectorDBError> {
        self.inner.index.close().await
    }

    /// Whether callers should show the retrieved chunks alongside answers.
    pub fn return_sources(&self) -> bool {
        self.inner.return_sources
    }
}
