use std::sync::Arc;
use thiserror::Error;

use crate::database::{ScoredChunk, VectorDBError};
use crate::llm::prompt::PromptTemplate;
use crate::providers::traits::CompletionProvider;

/// Request-scoped failures. None of these affect the built index.
#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("Failed to embed question: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] VectorDBError),
    #[error("No relevant context was retrieved for the question")]
    NoContext,
    #[error("Language model call failed: {0}")]
    Model(#[source] anyhow::Error),
}

/// Formats retrieved chunks into the prompt and asks the model.
#[derive(Clone)]
pub struct AnswerGenerator {
    provider: Arc<dyn CompletionProvider>,
    template: PromptTemplate,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, template: PromptTemplate) -> Self {
        Self { provider, template }
    }

    /// Chunk texts in rank order, separated by a blank line. Blank chunks are skipped.
    pub fn format_context(chunks: &[ScoredChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.chunk.text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn build_prompt(&self, question: &str, chunks: &[ScoredChunk]) -> Result<String, AnswerError> {
        let context = Self::format_context(chunks);
        if context.is_empty() {
            return Err(AnswerError::NoContext);
        }
        Ok(self.template.render(&context, question))
    }

    pub async fn generate(&self, question: &str, chunks: &[ScoredChunk]) -> Result<String, AnswerError> {
        let prompt = self.build_prompt(question, chunks)?;
        self.provider.complete(&prompt).await.map_err(|e| {
            log::warn!("Language model call failed: {}", e);
            AnswerError::Model(e)
        })
    }
}
