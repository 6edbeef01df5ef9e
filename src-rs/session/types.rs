use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::llm::models::provider_base::ImageAttachment;

pub const CORE_EVENT_PROTOCOL_VERSION: u16 = 1;

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One user or assistant turn in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

/// Per-model answer slot under a user message. `loading` flips off
/// exactly once, when the slot settles with either final stats or an
/// error (partial content from before the failure is kept).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub model_key: String,
    pub content: String,
    pub loading: bool,
    pub error: Option<String>,
    pub response_time_ms: Option<u64>,
    pub tokens: Option<u32>,
    pub cost: Option<f64>,
    pub timestamp_ms: i64,
}

impl ModelResponse {
    pub fn pending(model_key: &str) -> Self {
        Self {
            model_key: model_key.to_string(),
            content: String::new(),
            loading: true,
            error: None,
            response_time_ms: None,
            tokens: None,
            cost: None,
            timestamp_ms: now_ms(),
        }
    }
}

/// Full session state: the linear message history plus, per user
/// message id, the fan of model responses it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub selected_models: Vec<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub responses: HashMap<String, HashMap<String, ModelResponse>>,
    #[serde(default)]
    pub created_at_ms: i64,
    #[serde(default)]
    pub updated_at_ms: i64,
}

impl Session {
    pub fn new(id: String) -> Self {
        let now = now_ms();
        Self {
            id,
            title: None,
            system_prompt: None,
            selected_models: Vec::new(),
            messages: Vec::new(),
            responses: HashMap::new(),
            created_at_ms: now,
            updated_at_ms: now,
        }
    }
}

#[napi(string_enum)]
#[derive(Debug, PartialEq, Eq)]
pub enum CoreEventType {
    Chunk,
    SlotStart,
    SlotEnd,
    SlotError,
    Dropped,
    Title,
    End,
}

/// Event pushed to the JS subscriber. One flat shape for all kinds;
/// fields not meaningful for a kind stay `None`. `seq` is a per-session
/// monotonic counter so the UI can detect reordering.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct CoreEvent {
    #[napi(js_name = "protocolVersion")]
    pub protocol_version: u16,
    #[napi(js_name = "sessionId")]
    pub session_id: String,
    #[napi(js_name = "eventType")]
    pub event_type: CoreEventType,
    pub seq: Option<i64>,
    #[napi(js_name = "tsMs")]
    pub ts_ms: i64,
    #[napi(js_name = "modelKey")]
    pub model_key: Option<String>,
    #[napi(js_name = "messageId")]
    pub message_id: Option<String>,
    pub text: Option<String>,
    #[napi(js_name = "errorMessage")]
    pub error_message: Option<String>,
    pub tokens: Option<u32>,
    pub cost: Option<f64>,
    #[napi(js_name = "responseTimeMs")]
    pub response_time_ms: Option<i64>,
    pub success: Option<bool>,
}

impl CoreEvent {
    pub fn new(session_id: &str, event_type: CoreEventType) -> Self {
        Self {
            protocol_version: CORE_EVENT_PROTOCOL_VERSION,
            session_id: session_id.to_string(),
            event_type,
            seq: None,
            ts_ms: now_ms(),
            model_key: None,
            message_id: None,
            text: None,
            error_message: None,
            tokens: None,
            cost: None,
            response_time_ms: None,
            success: None,
        }
    }
}
