pub mod index;
pub mod memory;
pub mod qdrant_config;
pub mod vector_db;

pub use index::{IndexBuildError, StoreBackend, VectorIndex};
pub use memory::MemoryStore;
pub use vector_db::{IndexEntry, QdrantStore, ScoredChunk, VectorDBError, VectorStore};
