use crate::errors::CoreError;
use crate::llm::models::provider_base::{Message, ProviderClient};
use crate::llm::models::provider_handle::ProviderRegistry;

/// Result of a connectivity probe against one configured model.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub model_key: String,
    pub latency_ms: u64,
    pub reply: String,
}

/// Sends a minimal single-turn request and reports the round-trip time.
/// Goes through the same client the real dispatch would use, so a green
/// probe means credentials, endpoint, and model name all check out.
pub async fn probe_model(
    registry: &ProviderRegistry,
    model_key: &str,
) -> Result<ProbeResult, CoreError> {
    let client = registry.client_for(model_key)?;
    let messages = vec![Message::text("user", "ping")];
    let outcome = client.chat(messages).await?;
    Ok(ProbeResult {
        model_key: model_key.to_string(),
        latency_ms: outcome.response_time_ms,
        reply: outcome.content,
    })
}
