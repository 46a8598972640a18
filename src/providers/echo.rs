use async_trait::async_trait;
use anyhow::Result;
use crate::providers::traits::CompletionProvider;

/// Offline model that answers with the prompt it was given.
///
/// Useful for smoke-testing retrieval: whatever context was retrieved shows
/// up verbatim in the answer.
#[derive(Clone, Default)]
pub struct EchoProvider {
    system_message: String,
}

impl EchoProvider {
    pub fn new(system_message: String) -> Self {
        Self { system_message }
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("echo".to_string())
    }

    fn get_system_message(&self) -> String {
        self.system_message.clone()
    }
}
