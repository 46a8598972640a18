use async_trait::async_trait;
use anyhow::Result;

/// A language model that turns a fully formatted prompt into a completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    async fn get_model_info(&self) -> Result<String>;

    fn get_system_message(&self) -> String;
}
