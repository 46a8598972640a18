use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::{LlmProviderKind, ProviderConfig};
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::extract_completion;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Chat completions over any OpenAI-compatible HTTP endpoint
/// (DeepSeek, OpenRouter, self-hosted gateways).
#[derive(Clone)]
pub struct GatewayProvider {
    kind: LlmProviderKind,
    api_key: Option<String>,
    system_message: String,
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl GatewayProvider {
    pub fn new(
        kind: LlmProviderKind,
        api_url: &str,
        system_message: String,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            kind,
            api_key: config.api_key.clone(),
            system_message,
            client,
            endpoint: chat_endpoint(api_url),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for GatewayProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self.client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": self.system_message
                    },
                    {
                        "role": "user",
                        "content": prompt
                    }
                ],
                "temperature": self.temperature
            }));

        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }
        if self.kind == LlmProviderKind::OpenRouter {
            request = request.header("X-Title", "docqa");
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("API request failed: Status {}, Body: {}", status, error_text));
        }

        let response_json: Value = response.json().await?;
        extract_completion(&response_json)
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(format!("{}:{}", self.kind, self.model))
    }

    fn get_system_message(&self) -> String {
        self.system_message.clone()
    }
}

fn chat_endpoint(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_endpoint() {
        assert_eq!(
            chat_endpoint("https://api.deepseek.com/v1/"),
            "https://api.deepseek.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:1337/v1/chat/completions"),
            "http://localhost:1337/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_provider_from_config() {
        let config = ProviderConfig {
            model: "deepseek-chat".to_string(),
            api_url: None,
            api_key: Some("sk-test".to_string()),
            temperature: 0.2,
        };
        let provider = GatewayProvider::new(
            LlmProviderKind::DeepSeek,
            "https://api.deepseek.com/v1",
            "Be brief.".to_string(),
            &config,
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(provider.endpoint(), "https://api.deepseek.com/v1/chat/completions");
        assert_eq!(provider.get_model_info().await.unwrap(), "deepseek:deepseek-chat");
        assert_eq!(provider.get_system_message(), "Be brief.");
    }
}
