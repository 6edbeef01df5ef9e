use std::sync::Arc;
use std::time::Instant;

use crate::cons::provider_cons::split_model_key;
use crate::errors::CoreError;
use crate::llm::models::provider_base::{ImageAttachment, Message, ProviderClient};
use crate::llm::models::provider_handle::{AnyProviderClient, ProviderRegistry};
use crate::llm::pricing;
use crate::session::state::{
    emit_chunk, emit_dropped, emit_end, emit_slot_end, emit_slot_error, emit_slot_start,
    SessionStore,
};

#[derive(Debug, Clone)]
pub struct DroppedModel {
    pub model_key: String,
    pub reason: String,
}

/// What a single user turn dispatched: the new message id, the model
/// keys that got a streaming task, and the ones dropped up front.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub message_id: Option<String>,
    pub dispatched: Vec<String>,
    pub dropped: Vec<DroppedModel>,
}

/// Appends the user message and fans the turn out to every selected,
/// configured model concurrently. Per-model failures settle into the
/// slot's error field and never abort the siblings; the user message is
/// appended even when no model is ready, so the turn is not lost.
///
/// Resolves once every spawned stream has settled.
pub async fn dispatch_user_turn(
    session_id: &str,
    store: &Arc<SessionStore>,
    registry: &Arc<ProviderRegistry>,
    prompt: String,
    images: Vec<ImageAttachment>,
) -> DispatchOutcome {
    let snapshot = store.snapshot();
    let selected = snapshot.selected_models.clone();

    let mut ready: Vec<(String, Arc<AnyProviderClient>)> = Vec::new();
    let mut dropped: Vec<DroppedModel> = Vec::new();
    for model_key in &selected {
        match registry.client_for(model_key) {
            Ok(client) => ready.push((model_key.clone(), client)),
            Err(e) => {
                let reason = e.to_string();
                log::warn!("dropping {} from dispatch: {}", model_key, reason);
                emit_dropped(session_id, model_key, &reason);
                dropped.push(DroppedModel {
                    model_key: model_key.clone(),
                    reason,
                });
            }
        }
    }

    // Wire history is built from the snapshot taken above plus the new
    // message, not re-read after the append, so a concurrent mutation
    // cannot leak into this turn's prompt.
    let mut history: Vec<Message> = snapshot
        .messages
        .iter()
        .map(|m| Message {
            role: m.role.clone(),
            content: m.content.clone(),
            images: m.images.clone(),
        })
        .collect();
    history.push(Message {
        role: "user".to_string(),
        content: prompt.clone(),
        images: images.clone(),
    });

    let message_id = store.append_message("user", prompt, images);

    if ready.is_empty() {
        emit_end(session_id, &message_id);
        return DispatchOutcome {
            message_id: Some(message_id),
            dispatched: Vec::new(),
            dropped,
        };
    }

    let mut handles = Vec::with_capacity(ready.len());
    let mut dispatched = Vec::with_capacity(ready.len());
    for (model_key, client) in ready {
        store.add_response_slot(&message_id, &model_key);
        emit_slot_start(session_id, &message_id, &model_key);
        dispatched.push(model_key.clone());

        let session_id = session_id.to_string();
        let store = Arc::clone(store);
        let message_id = message_id.clone();
        let history = history.clone();
        handles.push(tokio::spawn(async move {
            run_model_stream(&session_id, &store, &client, &message_id, &model_key, history).await;
        }));
    }

    futures::future::join_all(handles).await;
    emit_end(session_id, &message_id);

    DispatchOutcome {
        message_id: Some(message_id),
        dispatched,
        dropped,
    }
}

async fn run_model_stream(
    session_id: &str,
    store: &Arc<SessionStore>,
    client: &AnyProviderClient,
    message_id: &str,
    model_key: &str,
    history: Vec<Message>,
) {
    let started = Instant::now();
    match drive_stream(store, client, session_id, message_id, model_key, history).await {
        Ok(tokens) => {
            let response_time_ms = started.elapsed().as_millis() as u64;
            let cost = match (tokens, split_model_key(model_key)) {
                (Some(t), Ok((provider, model))) => {
                    Some(pricing::calculate_cost(provider, model, t))
                }
                _ => None,
            };
            store.finalize_response_success(message_id, model_key, response_time_ms, tokens, cost);
            emit_slot_end(session_id, message_id, model_key, response_time_ms, tokens, cost);
        }
        Err(e) => {
            let error = e.to_string();
            log::error!("stream for {} failed: {}", model_key, error);
            store.finalize_response_error(message_id, model_key, &error);
            emit_slot_error(session_id, message_id, model_key, &error);
        }
    }
}

/// Drains one model's stream into its slot. Returns the final usage
/// figure on success; any error (connect or mid-stream) fails the slot
/// with the content streamed so far left intact.
async fn drive_stream(
    store: &Arc<SessionStore>,
    client: &AnyProviderClient,
    session_id: &str,
    message_id: &str,
    model_key: &str,
    history: Vec<Message>,
) -> Result<Option<u32>, CoreError> {
    let mut stream = client.stream_chat(history).await?;

    loop {
        let chunk = match tokio_stream::StreamExt::next(&mut stream).await {
            Some(result) => result?,
            None => return Ok(None),
        };
        if chunk.finished {
            return Ok(chunk.tokens);
        }
        if chunk.content.is_empty() {
            continue;
        }
        store.append_response_content(message_id, model_key, &chunk.content);
        emit_chunk(session_id, message_id, model_key, &chunk.content);
    }
}
