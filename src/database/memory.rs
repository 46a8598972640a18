use async_trait::async_trait;

use crate::database::vector_db::{top_k, IndexEntry, ScoredChunk, VectorDBError, VectorStore};

/// Exact cosine search over an in-process, immutable list of entries.
pub struct MemoryStore {
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

impl MemoryStore {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        let norms = entries.iter().map(|e| norm(&e.vector)).collect();
        Self { entries, norms }
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorDBError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = norm(query);
        let results: Vec<ScoredChunk> = self.entries
            .iter()
            .zip(&self.norms)
            .map(|(entry, &entry_norm)| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine(query, query_norm, &entry.vector, entry_norm),
            })
            .collect();

        Ok(top_k(results, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn entry(index: usize, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk: Chunk {
                index,
                offset: index * 10,
                text: format!("chunk {}", index),
                source: "test.txt".to_string(),
            },
            vector,
        }
    }

    #[tokio::test]
    async fn test_nearest_first() {
        let store = MemoryStore::new(vec![
            entry(0, vec![1.0, 0.0]),
            entry(1, vec![0.0, 1.0]),
            entry(2, vec![0.7, 0.7]),
        ]);
        let results = store.search(&[0.0, 2.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 1);
        assert_eq!(results[1].chunk.index, 2);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_keep_chunk_order() {
        let store = MemoryStore::new(vec![
            entry(0, vec![0.0, 1.0]),
            entry(1, vec![1.0, 0.0]),
            entry(2, vec![2.0, 0.0]),
            entry(3, vec![1.0, 0.0]),
        ]);
        let results = store.search(&[1.0, 0.0], 4).await.unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.chunk.index).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[tokio::test]
    async fn test_k_zero_and_k_larger_than_len() {
        let store = MemoryStore::new(vec![entry(0, vec![1.0]), entry(1, vec![1.0])]);
        assert!(store.search(&[1.0], 0).await.unwrap().is_empty());
        assert_eq!(store.search(&[1.0], 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_query_scores_zero() {
        let store = MemoryStore::new(vec![entry(0, vec![1.0, 1.0])]);
        let results = store.search(&[0.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].score, 0.0);
    }
}
