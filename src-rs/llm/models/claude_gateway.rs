use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::cons::provider_cons::LLMProvider;
use crate::errors::CoreError;
use crate::llm::models::openai_compat::{provider_error_from_body, sse_data_stream};
use crate::llm::models::provider_base::{
    ChatOutcome, ChunkStream, ImageAttachment, Message, ProviderClient, StreamChunk,
};
use crate::llm::pricing;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CHAT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Text delta of an Anthropic `content_block_delta` event.
pub(crate) fn extract_text_from_anthropic_event(event: &Value) -> Option<&str> {
    match event.pointer("/type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => event
            .pointer("/delta/text")
            .and_then(|v| v.as_str()),
        _ => None,
    }
}

/// Client for the Anthropic messages protocol. The gateway deployment
/// speaks the stock `/v1/messages` surface, so system prompts travel as
/// a top-level field and images as base64 source blocks.
#[derive(Debug, Clone)]
pub struct ClaudeGatewayClient {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    http_client: reqwest::Client,
}

impl ClaudeGatewayClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url,
            api_key,
            model,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: LLMProvider::ClaudeGateway.max_output_tokens(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_generation(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn image_block(image: &ImageAttachment) -> Option<Value> {
        match image {
            ImageAttachment::Base64 { media_type, data } => Some(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": data,
                }
            })),
            ImageAttachment::FileTag { .. } => None,
        }
    }

    /// System messages in the history are merged into the top-level
    /// `system` field; the rest become content-block messages.
    pub(crate) fn build_request_body(&self, messages: Vec<Message>, stream: bool) -> Value {
        let mut system_parts: Vec<String> = Vec::new();
        if let Some(prompt) = &self.system_prompt {
            system_parts.push(prompt.clone());
        }

        let mut formatted: Vec<Value> = Vec::with_capacity(messages.len());
        for msg in messages {
            if msg.role == "system" {
                system_parts.push(msg.content);
                continue;
            }
            if msg.images.is_empty() {
                formatted.push(json!({ "role": msg.role, "content": msg.content }));
            } else {
                let mut blocks: Vec<Value> = msg
                    .images
                    .iter()
                    .filter_map(Self::image_block)
                    .collect();
                blocks.push(json!({ "type": "text", "text": msg.content }));
                formatted.push(json!({ "role": msg.role, "content": blocks }));
            }
        }

        let max_tokens = self
            .max_tokens
            .min(LLMProvider::ClaudeGateway.max_output_tokens());
        let mut body = json!({
            "model": self.model,
            "messages": formatted,
            "temperature": self.temperature,
            "max_tokens": max_tokens,
            "stream": stream,
        });
        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }
        body
    }

    async fn send_request(
        &self,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, CoreError> {
        let mut request = self
            .http_client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(provider_error_from_body(status, &error_text));
        }
        Ok(response)
    }
}

impl ProviderClient for ClaudeGatewayClient {
    async fn stream_chat(&self, messages: Vec<Message>) -> Result<ChunkStream, CoreError> {
        let body = self.build_request_body(messages, true);
        let response = self.send_request(&body, None).await?;

        let bytes = response.bytes_stream();
        let bytes = tokio_stream::StreamExt::map(bytes, |chunk| chunk.map_err(CoreError::from));
        let data = sse_data_stream(Box::pin(bytes));

        let stream = Box::pin(async_stream::stream! {
            let mut data = data;
            let mut output_tokens: Option<u32> = None;

            while let Some(data_result) = tokio_stream::StreamExt::next(&mut data).await {
                let payload = match data_result {
                    Ok(p) => p,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let event: Value = match serde_json::from_str(&payload) {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!(
                            "skipping malformed stream event: {}",
                            CoreError::Parse(e.to_string())
                        );
                        continue;
                    }
                };

                match event.pointer("/type").and_then(|t| t.as_str()) {
                    Some("message_stop") => break,
                    Some("message_delta") => {
                        if let Some(tokens) = event
                            .pointer("/usage/output_tokens")
                            .and_then(|v| v.as_u64())
                        {
                            output_tokens = Some(tokens as u32);
                        }
                    }
                    Some("error") => {
                        let message = event
                            .pointer("/error/message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("stream error");
                        yield Err(CoreError::Provider(message.to_string()));
                        return;
                    }
                    _ => {}
                }

                if let Some(text) = extract_text_from_anthropic_event(&event) {
                    if !text.is_empty() {
                        yield Ok(StreamChunk::delta(text));
                    }
                }
            }

            yield Ok(StreamChunk::finished(output_tokens));
        });

        Ok(stream)
    }

    async fn chat(&self, messages: Vec<Message>) -> Result<ChatOutcome, CoreError> {
        let body = self.build_request_body(messages, false);
        let started = Instant::now();
        let response = self.send_request(&body, Some(CHAT_REQUEST_TIMEOUT)).await?;

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Provider(format!("unreadable response body: {}", e)))?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let content = parsed
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let input_tokens = parsed
            .pointer("/usage/input_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let output_tokens = parsed
            .pointer("/usage/output_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let tokens = match input_tokens + output_tokens {
            0 => None,
            total => Some(total as u32),
        };
        let cost = tokens.map(|t| {
            pricing::calculate_cost(LLMProvider::ClaudeGateway, &self.model, t)
        });

        Ok(ChatOutcome {
            content,
            tokens,
            cost,
            response_time_ms,
        })
    }
}
