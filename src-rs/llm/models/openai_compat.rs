use serde_json::{json, Value};
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio_stream::Stream;

use crate::cons::provider_cons::LLMProvider;
use crate::errors::CoreError;
use crate::llm::models::provider_base::{
    ChatOutcome, ChunkStream, Message, ProviderClient, StreamChunk,
};
use crate::llm::pricing;

const CHAT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DONE_SENTINEL: &str = "[DONE]";

pub(crate) fn extract_sse_frame_from_buffer(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let mut delimiter_len = 0usize;
    let delimiter_pos = if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
        delimiter_len = 4;
        Some(pos)
    } else {
        buffer.windows(2).position(|w| w == b"\n\n").map(|pos| {
            delimiter_len = 2;
            pos
        })
    }?;

    let frame = buffer.drain(..delimiter_pos).collect::<Vec<u8>>();
    buffer.drain(..delimiter_len);
    Some(frame)
}

pub(crate) fn sse_data_from_frame(frame: &str) -> Option<String> {
    let mut data_parts: Vec<&str> = Vec::new();

    for raw_line in frame.lines() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            data_parts.push(rest);
        }
    }

    if data_parts.is_empty() {
        return None;
    }
    Some(data_parts.join("\n"))
}

/// Reassembles `data:` payloads from a raw byte stream. Frames split by
/// blank lines, CRLF or LF; a trailing unterminated frame is flushed
/// when the body closes.
pub(crate) fn sse_data_stream<T>(
    stream: Pin<Box<dyn Stream<Item = Result<T, CoreError>> + Send>>,
) -> Pin<Box<dyn Stream<Item = Result<String, CoreError>> + Send>>
where
    T: AsRef<[u8]> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = stream;
        while let Some(chunk_result) = tokio_stream::StreamExt::next(&mut stream).await {
            let bytes = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            buffer.extend_from_slice(bytes.as_ref());

            while let Some(frame_bytes) = extract_sse_frame_from_buffer(&mut buffer) {
                let frame = String::from_utf8_lossy(&frame_bytes);
                if let Some(data) = sse_data_from_frame(&frame) {
                    yield Ok(data);
                }
            }
        }

        if !buffer.is_empty() {
            let frame = String::from_utf8_lossy(&buffer);
            if let Some(data) = sse_data_from_frame(&frame) {
                yield Ok(data);
            }
        }
    })
}

/// Incremental text delta of one chat-completions stream event.
pub(crate) fn extract_stream_delta(event: &Value) -> Option<&str> {
    event
        .pointer("/choices/0/delta/content")
        .and_then(|v| v.as_str())
}

/// Some vendors attach a usage object to in-stream events; the latest
/// figure seen wins.
pub(crate) fn extract_usage_total(event: &Value) -> Option<u32> {
    event
        .pointer("/usage/total_tokens")
        .and_then(|v| v.as_u64())
        .map(|t| t as u32)
}

/// Vendor error payloads embed a message under `error.message`; fall
/// back to the HTTP status line when the body is not JSON.
pub(crate) fn provider_error_from_body(status: reqwest::StatusCode, body: &str) -> CoreError {
    let embedded = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });
    match embedded {
        Some(msg) => CoreError::Provider(msg),
        None => CoreError::Provider(format!("HTTP {}", status)),
    }
}

/// Client for the OpenAI chat-completions wire protocol, shared by the
/// DeepSeek, Aliyun (compatible-mode), Volcengine Ark, and Moonshot
/// providers. Vision-capable providers get mixed text/image_url content
/// parts; the others send plain text and ignore attachments.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    pub provider: LLMProvider,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    http_client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(provider: LLMProvider, base_url: String, api_key: String, model: String) -> Self {
        Self {
            provider,
            base_url,
            api_key,
            model,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: provider.max_output_tokens(),
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
        format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Maps wire messages to the vendor shape, prepending the system
    /// prompt when none is present in the history.
    pub(crate) fn format_messages(&self, messages: Vec<Message>) -> Vec<Value> {
        let vision = self.provider.supports_vision();
        let mut formatted: Vec<Value> = Vec::with_capacity(messages.len() + 1);

        if let Some(prompt) = &self.system_prompt {
            if !messages.iter().any(|m| m.role == "system") {
                formatted.push(json!({ "role": "system", "content": prompt }));
            }
        }

        for msg in messages {
            if vision && !msg.images.is_empty() {
                let mut parts = vec![json!({ "type": "text", "text": msg.content })];
                for image in &msg.images {
                    if let Some(uri) = image.to_data_uri() {
                        parts.push(json!({
                            "type": "image_url",
                            "image_url": { "url": uri }
                        }));
                    }
                }
                formatted.push(json!({ "role": msg.role, "content": parts }));
            } else {
                formatted.push(json!({ "role": msg.role, "content": msg.content }));
            }
        }
        formatted
    }

    fn build_request_body(&self, messages: Vec<Message>, stream: bool) -> Value {
        let max_tokens = self.max_tokens.min(self.provider.max_output_tokens());
        json!({
            "model": self.model,
            "messages": self.format_messages(messages),
            "temperature": self.temperature,
            "max_tokens": max_tokens,
            "stream": stream,
        })
    }

    async fn send_request(
        &self,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, CoreError> {
        let mut request = self
            .http_client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
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

impl ProviderClient for OpenAiCompatClient {
    async fn stream_chat(&self, messages: Vec<Message>) -> Result<ChunkStream, CoreError> {
        let body = self.build_request_body(messages, true);
        let response = self.send_request(&body, None).await?;

        let bytes = response.bytes_stream();
        let bytes = tokio_stream::StreamExt::map(bytes, |chunk| chunk.map_err(CoreError::from));
        let data = sse_data_stream(Box::pin(bytes));

        let stream = Box::pin(async_stream::stream! {
            let mut data = data;
            let mut latest_tokens: Option<u32> = None;

            while let Some(data_result) = tokio_stream::StreamExt::next(&mut data).await {
                let payload = match data_result {
                    Ok(p) => p,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if payload.trim() == DONE_SENTINEL {
                    break;
                }
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
                if let Some(total) = extract_usage_total(&event) {
                    latest_tokens = Some(total);
                }
                if let Some(delta) = extract_stream_delta(&event) {
                    if !delta.is_empty() {
                        yield Ok(StreamChunk::delta(delta));
                    }
                }
            }

            // Exactly one terminal chunk, [DONE] sentinel or not.
            yield Ok(StreamChunk::finished(latest_tokens));
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
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let tokens = extract_usage_total(&parsed);
        let cost =
            tokens.map(|t| pricing::calculate_cost(self.provider, &self.model, t));

        Ok(ChatOutcome {
            content,
            tokens,
            cost,
            response_time_ms,
        })
    }
}
