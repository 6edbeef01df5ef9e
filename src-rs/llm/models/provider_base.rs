use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::errors::CoreError;

/// One image carried on a user message: either an inline base64 blob
/// (forwarded to vision-capable providers as a data URI / base64 block)
/// or an opaque filename tag for attachments the UI parsed elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageAttachment {
    Base64 { media_type: String, data: String },
    FileTag { name: String },
}

impl ImageAttachment {
    pub fn to_data_uri(&self) -> Option<String> {
        match self {
            ImageAttachment::Base64 { media_type, data } => {
                Some(format!("data:{};base64,{}", media_type, data))
            }
            ImageAttachment::FileTag { .. } => None,
        }
    }
}

/// Wire-level chat message, the shape adapters translate into a vendor
/// payload. Distinct from the session-level `ChatMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl Message {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            images: Vec::new(),
        }
    }
}

/// One incremental streaming event. Adapters emit zero or more
/// non-finished chunks carrying a text delta, then exactly one
/// `finished` chunk (empty content) carrying the last usage figure the
/// vendor reported in-stream, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub finished: bool,
    pub tokens: Option<u32>,
}

impl StreamChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finished: false,
            tokens: None,
        }
    }

    pub fn finished(tokens: Option<u32>) -> Self {
        Self {
            content: String::new(),
            finished: true,
            tokens,
        }
    }
}

/// Result of a settled non-streaming call.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub content: String,
    pub tokens: Option<u32>,
    pub cost: Option<f64>,
    pub response_time_ms: u64,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, CoreError>> + Send>>;

#[allow(async_fn_in_trait)]
pub trait ProviderClient: Send + Sync {
    /// Opens a streaming call. A pre-stream failure (non-2xx before any
    /// bytes, connection refused) fails the whole call; once the stream
    /// is open, a reader error is yielded as an `Err` item and ends it.
    async fn stream_chat(&self, messages: Vec<Message>) -> Result<ChunkStream, CoreError>;

    /// Non-streaming call with a fixed request timeout.
    async fn chat(&self, messages: Vec<Message>) -> Result<ChatOutcome, CoreError>;
}
