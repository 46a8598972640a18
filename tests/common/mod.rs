#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use docqa::document::ChunkConfig;
use docqa::llm::{Embedder, LexicalEmbedder};
use docqa::providers::echo::EchoProvider;
use docqa::providers::traits::CompletionProvider;
use docqa::QAServiceBuilder;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const CLINIC: &str = "Riverside Clinic opening hours.\n\
The clinic opens at 9am on weekdays and closes at 5pm.\n\
On Saturdays the clinic opens at 10am. It is closed on Sundays and public holidays.\n\
\n\
Parking is available behind the building. Visitors should check in at the front desk.\n";

pub fn corpus(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

/// Pads every segment to `width` characters so that chunking with
/// `ChunkConfig::new(width, 0)` yields exactly one chunk per segment.
pub fn padded(segments: &[&str], width: usize) -> String {
    segments
        .iter()
        .map(|s| {
            assert!(s.chars().count() <= width);
            format!("{:<width$}", s, width = width)
        })
        .collect()
}

/// Lexical embeddings and an echoing model: no network involved.
pub fn offline(path: &Path) -> QAServiceBuilder {
    QAServiceBuilder::new(path)
        .embedder(Arc::new(LexicalEmbedder::default()))
        .provider(Arc::new(EchoProvider::default()))
        .chunk_config(ChunkConfig::new(200, 40).unwrap())
}

pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model_name(&self) -> &str {
        "down"
    }

    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow!("embedding service unavailable"))
    }
}

pub struct DownProvider;

#[async_trait]
impl CompletionProvider for DownProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("model backend unavailable"))
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("down".to_string())
    }

    fn get_system_message(&self) -> String {
        String::new()
    }
}
