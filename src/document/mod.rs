mod chunker;
mod loader;

pub use chunker::{Chunk, ChunkConfig, ChunkConfigError, Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use loader::{load_document, Document, LoadError, TextEncoding};
