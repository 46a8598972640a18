pub mod embeddings;
pub mod prompt;
pub mod qa;

pub use embeddings::{create_embedder, Embedder, LexicalEmbedder, OpenAIEmbedder};
pub use prompt::{PromptTemplate, TemplateError};
pub use qa::{AnswerError, AnswerGenerator};
