use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions,
        CreateCollectionBuilder, DeleteCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
        UpsertPointsBuilder, VectorParamsBuilder,
    },
    Payload, Qdrant,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::database::qdrant_config::create_qdrant_client;
use crate::document::Chunk;

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Operation failed: {0}")]
    Operation(String),
    #[error("Query vector has dimension {got}, index was built with {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// A chunk and the vector it was embedded to.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

/// Read-only nearest-neighbour search over a fully loaded set of entries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` entries by descending similarity, ties in chunk order.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorDBError>;

    /// Release anything held outside this process.
    async fn close(&self) -> Result<(), VectorDBError> {
        Ok(())
    }
}

/// Orders by descending score, then ascending chunk index.
pub(crate) fn rank(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.index.cmp(&b.chunk.index))
    });
}

/// Ranks `results` and keeps the best `k`.
pub(crate) fn top_k(mut results: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    rank(&mut results);
    results.truncate(k);
    results
}

/// Extra candidates asked of Qdrant so ties at the cut-off are settled by
/// chunk order. A tie spanning more than this many points is still cut where
/// Qdrant cut it.
const TIE_SLACK: usize = 16;

/// Entries held in a Qdrant collection that lives as long as this process.
///
/// Qdrant only scores; chunk text is kept locally and looked up by point id.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    chunks: Vec<Chunk>,
}

impl QdrantStore {
    /// Create a fresh collection and upload every entry. On any failure the
    /// collection is dropped again so nothing half-built is left behind.
    pub async fn create(url: &str, collection_prefix: &str, entries: Vec<IndexEntry>) -> Result<Self, VectorDBError> {
        let client = create_qdrant_client(url).await?;
        let collection = format!("{}-{}", collection_prefix, Uuid::new_v4());
        let dimension = entries.first().map(|e| e.vector.len()).unwrap_or_default();

        client
            .create_collection(
                CreateCollectionBuilder::new(collection.clone())
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        match upload(&client, &collection, &entries).await {
            Ok(()) => {
                log::info!("Stored {} vectors in Qdrant collection {}", entries.len(), collection);
                let mut chunks: Vec<Chunk> = entries.into_iter().map(|e| e.chunk).collect();
                chunks.sort_by_key(|c| c.index);
                Ok(Self { client, collection, chunks })
            }
            Err(e) => {
                if let Err(cleanup) = drop_collection(&client, &collection).await {
                    log::warn!("Failed to drop partial collection {}: {}", collection, cleanup);
                }
                Err(e)
            }
        }
    }
}

async fn drop_collection(client: &Qdrant, collection: &str) -> Result<(), VectorDBError> {
    client
        .delete_collection(DeleteCollectionBuilder::new(collection))
        .await
        .map_err(|e| VectorDBError::Operation(e.to_string()))?;
    Ok(())
}

async fn upload(client: &Qdrant, collection: &str, entries: &[IndexEntry]) -> Result<(), VectorDBError> {
    let mut points = Vec::with_capacity(entries.len());
    for entry in entries {
        let payload = Payload::try_from(json!({
            "text": entry.chunk.text,
            "source": entry.chunk.source,
            "offset": entry.chunk.offset,
        }))
        .map_err(|e| VectorDBError::Operation(e.to_string()))?;
        points.push(PointStruct::new(entry.chunk.index as u64, entry.vector.clone(), payload));
    }

    client
        .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
        .await
        .map_err(|e| VectorDBError::Operation(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn len(&self) -> usize {
        self.chunks.len()
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorDBError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let response = self.client
            .search_points(SearchPointsBuilder::new(
                self.collection.clone(),
                query.to_vec(),
                (k + TIE_SLACK) as u64,
            ))
            .await
            .map_err(|e| VectorDBError::Operation(e.to_string()))?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let index = match point.id.and_then(|id| id.point_id_options) {
                Some(PointIdOptions::Num(n)) => n as usize,
                other => {
                    return Err(VectorDBError::Operation(format!("Unexpected point id: {:?}", other)));
                }
            };
            let chunk = self.chunks
                .binary_search_by_key(&index, |c| c.index)
                .map(|pos| self.chunks[pos].clone())
                .map_err(|_| VectorDBError::Operation(format!("Unknown chunk index {}", index)))?;
            results.push(ScoredChunk { chunk, score: point.score });
        }

        Ok(top_k(results, k))
    }

    async fn close(&self) -> Result<(), VectorDBError> {
        drop_collection(&self.client, &self.collection).await?;
        log::info!("Dropped Qdrant collection {}", self.collection);
        Ok(())
    }
}
