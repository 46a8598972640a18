pub mod echo;
pub mod gateway;
pub mod openai;
pub mod traits;
pub mod utils;

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError, LlmProviderKind};
use echo::EchoProvider;
use gateway::gateway::GatewayProvider;
use openai::openai::OpenAIProvider;
use traits::CompletionProvider;

/// Build the configured language model backend.
pub fn create_provider(config: &AppConfig) -> Result<Arc<dyn CompletionProvider>, ConfigError> {
    let kind = config.llm_provider;
    let settings = &config.llm;
    let key_var = format!("{}_API_KEY", kind.name().to_uppercase());

    let provider: Arc<dyn CompletionProvider> = match kind {
        LlmProviderKind::OpenAI => {
            let api_key = settings.api_key.clone().ok_or(ConfigError::MissingApiKey(key_var))?;
            Arc::new(OpenAIProvider::new(api_key, config.system_message.clone(), settings))
        }
        LlmProviderKind::DeepSeek | LlmProviderKind::OpenRouter | LlmProviderKind::Gateway => {
            if kind != LlmProviderKind::Gateway && settings.api_key.is_none() {
                return Err(ConfigError::MissingApiKey(key_var));
            }
            let api_url = settings.api_url.as_deref().ok_or_else(|| {
                ConfigError::MissingApiUrl(
                    kind.to_string(),
                    format!("{}_API_URL", kind.name().to_uppercase()),
                )
            })?;
            let provider = GatewayProvider::new(
                kind,
                api_url,
                config.system_message.clone(),
                settings,
                config.request_timeout,
            )
            .map_err(|e| ConfigError::InvalidValue {
                key: format!("{}_API_URL", kind.name().to_uppercase()),
                value: e.to_string(),
            })?;
            Arc::new(provider)
        }
        LlmProviderKind::Echo => Arc::new(EchoProvider::new(config.system_message.clone())),
    };

    log::info!("Using {} language model ({})", kind, settings.model);
    Ok(provider)
}
