use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::cons::provider_cons::{split_model_key, LLMProvider};
use crate::errors::CoreError;
use crate::llm::models::claude_gateway::ClaudeGatewayClient;
use crate::llm::models::openai_compat::OpenAiCompatClient;
use crate::llm::models::provider_base::{ChatOutcome, ChunkStream, Message, ProviderClient};
#[cfg(test)]
use crate::llm::models::scripted::ScriptedClient;

/// Closed set of concrete provider clients. Dispatch is a match, not a
/// vtable; adding a provider means adding a variant here and teaching
/// `create_client` about it.
#[derive(Debug, Clone)]
pub enum AnyProviderClient {
    OpenAiCompat(OpenAiCompatClient),
    ClaudeGateway(ClaudeGatewayClient),
    #[cfg(test)]
    Scripted(ScriptedClient),
}

impl ProviderClient for AnyProviderClient {
    async fn stream_chat(&self, messages: Vec<Message>) -> Result<ChunkStream, CoreError> {
        match self {
            AnyProviderClient::OpenAiCompat(c) => c.stream_chat(messages).await,
            AnyProviderClient::ClaudeGateway(c) => c.stream_chat(messages).await,
            #[cfg(test)]
            AnyProviderClient::Scripted(c) => c.stream_chat(messages).await,
        }
    }

    async fn chat(&self, messages: Vec<Message>) -> Result<ChatOutcome, CoreError> {
        match self {
            AnyProviderClient::OpenAiCompat(c) => c.chat(messages).await,
            AnyProviderClient::ClaudeGateway(c) => c.chat(messages).await,
            #[cfg(test)]
            AnyProviderClient::Scripted(c) => c.chat(messages).await,
        }
    }
}

pub fn create_client(
    provider: LLMProvider,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: Option<String>,
    temperature: f32,
    max_tokens: u32,
) -> AnyProviderClient {
    match provider {
        LLMProvider::ClaudeGateway => AnyProviderClient::ClaudeGateway(
            ClaudeGatewayClient::new(base_url, api_key, model)
                .with_system_prompt(system_prompt)
                .with_generation(temperature, max_tokens),
        ),
        _ => AnyProviderClient::OpenAiCompat(
            OpenAiCompatClient::new(provider, base_url, api_key, model)
                .with_system_prompt(system_prompt)
                .with_generation(temperature, max_tokens),
        ),
    }
}

/// Ready-to-call clients keyed by `"provider:model"`. Built once per
/// dispatch from the current configuration; only providers with a
/// non-blank, format-valid credential get entries, so absence of a key
/// here is exactly "not configured".
#[derive(Default)]
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<AnyProviderClient>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig, system_prompt: Option<String>) -> Self {
        let mut clients = HashMap::new();
        let temperature = config.request.temperature;

        for provider_cfg in &config.providers {
            let Some(provider) = LLMProvider::from_name(&provider_cfg.name) else {
                log::warn!("ignoring unknown provider in config: {}", provider_cfg.name);
                continue;
            };
            let api_key = provider_cfg.api_key.trim();
            if api_key.is_empty() {
                continue;
            }
            if let Err(e) = provider.validate_api_key(api_key) {
                log::warn!("skipping provider {}: {}", provider, e);
                continue;
            }

            let max_tokens = config
                .request
                .max_output_tokens
                .min(provider.max_output_tokens());
            for model in &provider_cfg.models {
                let key = format!("{}:{}", provider.provider_name(), model);
                let client = create_client(
                    provider,
                    provider_cfg.base_url.clone(),
                    api_key.to_string(),
                    model.clone(),
                    system_prompt.clone(),
                    temperature,
                    max_tokens,
                );
                clients.insert(key, Arc::new(client));
            }
        }

        Self { clients }
    }

    pub fn is_configured(&self, model_key: &str) -> bool {
        self.clients.contains_key(model_key)
    }

    pub fn client_for(&self, model_key: &str) -> Result<Arc<AnyProviderClient>, CoreError> {
        if let Some(client) = self.clients.get(model_key) {
            return Ok(Arc::clone(client));
        }
        let (provider, _) = split_model_key(model_key)?;
        Err(CoreError::Configuration(format!(
            "missing credential for provider {}",
            provider
        )))
    }

    /// First configured client, used for background work (titles) that
    /// does not care which model answers.
    pub fn any_client(&self) -> Option<(String, Arc<AnyProviderClient>)> {
        let mut keys: Vec<&String> = self.clients.keys().collect();
        keys.sort();
        keys.first()
            .map(|k| ((*k).clone(), Arc::clone(&self.clients[*k])))
    }

    pub fn configured_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.clients.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, model_key: &str, client: AnyProviderClient) {
        self.clients.insert(model_key.to_string(), Arc::new(client));
    }
}
