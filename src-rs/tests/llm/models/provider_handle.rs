use crate::config::{AppConfig, ProviderConfig, RequestConfig, RuntimeConfig};
use crate::errors::CoreError;
use crate::llm::models::provider_base::{Message, ProviderClient};
use crate::llm::models::provider_handle::*;
use crate::llm::models::scripted::ScriptedClient;

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(providers: Vec<ProviderConfig>) -> AppConfig {
        AppConfig {
            runtime: RuntimeConfig::default(),
            providers,
            request: RequestConfig::default(),
        }
    }

    fn provider(name: &str, api_key: &str, models: &[&str]) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            brand: None,
            base_url: format!("https://{}.example.invalid", name),
            api_key: api_key.to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn registry_only_contains_credentialed_providers() {
        let config = config_with(vec![
            provider("deepseek", "sk-0123456789abcdef0123", &["deepseek-chat"]),
            provider("moonshot", "", &["moonshot-v1-8k"]),
        ]);
        let registry = ProviderRegistry::from_config(&config, None);

        assert!(registry.is_configured("deepseek:deepseek-chat"));
        assert!(!registry.is_configured("moonshot:moonshot-v1-8k"));
        assert_eq!(registry.configured_keys(), vec!["deepseek:deepseek-chat"]);
    }

    #[test]
    fn malformed_credentials_are_skipped() {
        let config = config_with(vec![provider("deepseek", "not-a-key", &["deepseek-chat"])]);
        let registry = ProviderRegistry::from_config(&config, None);
        assert!(!registry.is_configured("deepseek:deepseek-chat"));
    }

    #[test]
    fn unknown_provider_names_are_ignored() {
        let config = config_with(vec![provider("openai", "sk-0123456789abcdef0123", &["gpt-4"])]);
        let registry = ProviderRegistry::from_config(&config, None);
        assert!(registry.configured_keys().is_empty());
    }

    #[test]
    fn missing_credential_names_the_provider() {
        let registry = ProviderRegistry::from_config(&config_with(vec![]), None);
        let err = registry.client_for("moonshot:moonshot-v1-8k").unwrap_err();
        match err {
            CoreError::Configuration(msg) => {
                assert_eq!(msg, "missing credential for provider moonshot");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn client_for_bad_key_reports_the_key_shape() {
        let registry = ProviderRegistry::from_config(&config_with(vec![]), None);
        assert!(registry.client_for("nocolon").is_err());
    }

    #[test]
    fn any_client_picks_lowest_key() {
        let mut registry = ProviderRegistry::default();
        registry.insert("deepseek:deepseek-chat", AnyProviderClient::Scripted(ScriptedClient::default()));
        registry.insert("aliyun:qwen-plus", AnyProviderClient::Scripted(ScriptedClient::default()));

        let (key, _) = registry.any_client().unwrap();
        assert_eq!(key, "aliyun:qwen-plus");
    }

    #[tokio::test]
    async fn scripted_client_streams_through_the_enum() {
        let client =
            AnyProviderClient::Scripted(ScriptedClient::replying(&["He", "llo"]).with_tokens(7));
        let mut stream = client
            .stream_chat(vec![Message::text("user", "hi")])
            .await
            .unwrap();

        let mut collected = String::new();
        let mut terminal_tokens = None;
        let mut terminal_count = 0;
        while let Some(chunk) = tokio_stream::StreamExt::next(&mut stream).await {
            let chunk = chunk.unwrap();
            if chunk.finished {
                terminal_tokens = chunk.tokens;
                terminal_count += 1;
            } else {
                collected.push_str(&chunk.content);
            }
        }
        assert_eq!(collected, "Hello");
        assert_eq!(terminal_tokens, Some(7));
        assert_eq!(terminal_count, 1);
    }
}
