use qdrant_client::Qdrant;
use std::time::Duration;

use crate::database::vector_db::VectorDBError;

/// The REST port Qdrant advertises is 6333; the client speaks gRPC on 6334.
fn grpc_url(url: &str) -> String {
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url).to_string()
    } else {
        url.to_string()
    };
    let clean_url = clean_url.trim_end_matches('/');

    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url.to_string()
    };

    format!("http://{}", grpc_url)
}

pub async fn create_qdrant_client(url: &str) -> Result<Qdrant, VectorDBError> {
    let url_with_scheme = grpc_url(url);
    log::info!("Attempting to connect to Qdrant with URL: {}", url_with_scheme);

    let client = Qdrant::from_url(&url_with_scheme)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| VectorDBError::Connection(e.to_string()))?;

    // Test the connection
    match client.list_collections().await {
        Ok(_) => {
            log::info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            log::error!("Connection test failed: {}", e);
            Err(VectorDBError::Connection(format!("Failed to connect to Qdrant: {}", e)))
        }
    }
}
