use std::time::Duration;

use crate::errors::CoreError;
use crate::llm::models::provider_base::{
    ChatOutcome, ChunkStream, Message, ProviderClient, StreamChunk,
};

/// Test double that plays back a fixed chunk script instead of talking
/// to a vendor. Failure points are injectable at connect time or after
/// the scripted chunks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    pub chunks: Vec<String>,
    pub tokens: Option<u32>,
    pub fail_on_connect: Option<String>,
    pub fail_mid_stream: Option<String>,
    pub delay_ms: u64,
}

impl ScriptedClient {
    pub fn replying(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn failing_on_connect(message: &str) -> Self {
        Self {
            fail_on_connect: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_mid_stream(chunks: &[&str], message: &str) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_mid_stream: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

impl ProviderClient for ScriptedClient {
    async fn stream_chat(&self, _messages: Vec<Message>) -> Result<ChunkStream, CoreError> {
        if let Some(message) = &self.fail_on_connect {
            return Err(CoreError::Provider(message.clone()));
        }

        let chunks = self.chunks.clone();
        let tokens = self.tokens;
        let fail_mid_stream = self.fail_mid_stream.clone();
        let delay_ms = self.delay_ms;

        let stream = Box::pin(async_stream::stream! {
            for chunk in chunks {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                yield Ok(StreamChunk::delta(chunk));
            }
            if let Some(message) = fail_mid_stream {
                yield Err(CoreError::Provider(message));
                return;
            }
            yield Ok(StreamChunk::finished(tokens));
        });

        Ok(stream)
    }

    async fn chat(&self, _messages: Vec<Message>) -> Result<ChatOutcome, CoreError> {
        if let Some(message) = &self.fail_on_connect {
            return Err(CoreError::Provider(message.clone()));
        }
        Ok(ChatOutcome {
            content: self.chunks.concat(),
            tokens: self.tokens,
            cost: None,
            response_time_ms: self.delay_ms,
        })
    }
}
