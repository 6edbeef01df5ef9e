use std::sync::{Arc, Mutex as StdMutex};

use napi::threadsafe_function::ThreadsafeFunctionCallMode;
use napi::Status;

use super::context::SessionEventSink;
use super::manager::SESSION_MANAGER;
use crate::llm::models::provider_base::ImageAttachment;
use crate::session::id::generate_message_id;
use crate::session::types::{now_ms, ChatMessage, CoreEvent, CoreEventType, ModelResponse, Session};

/// Copy-on-write holder for one session's state.
///
/// Readers take an `Arc<Session>` snapshot and never block writers;
/// every mutation clones the current state, applies the change, and
/// swaps the Arc under a short-lived lock. Concurrent stream tasks for
/// different model slots therefore interleave at delta granularity
/// without ever observing a half-applied update.
pub struct SessionStore {
    current: StdMutex<Arc<Session>>,
}

impl SessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            current: StdMutex::new(Arc::new(session)),
        }
    }

    pub fn snapshot(&self) -> Arc<Session> {
        Arc::clone(&self.current.lock().unwrap())
    }

    fn replace(&self, mutate: impl FnOnce(&mut Session)) {
        let mut guard = self.current.lock().unwrap();
        let mut next = (**guard).clone();
        mutate(&mut next);
        next.updated_at_ms = now_ms();
        *guard = Arc::new(next);
    }

    /// Replaces the whole state, used by import.
    pub fn reset(&self, session: Session) {
        let mut guard = self.current.lock().unwrap();
        *guard = Arc::new(session);
    }

    pub fn append_message(
        &self,
        role: &str,
        content: String,
        images: Vec<ImageAttachment>,
    ) -> String {
        let message_id = generate_message_id();
        let message = ChatMessage {
            id: message_id.clone(),
            role: role.to_string(),
            content,
            timestamp_ms: now_ms(),
            images,
        };
        self.replace(|session| session.messages.push(message));
        message_id
    }

    pub fn add_response_slot(&self, message_id: &str, model_key: &str) {
        self.replace(|session| {
            session
                .responses
                .entry(message_id.to_string())
                .or_default()
                .insert(model_key.to_string(), ModelResponse::pending(model_key));
        });
    }

    /// Appends a streamed delta to a slot. Returns false (and leaves the
    /// state untouched) when the slot does not exist, e.g. after an
    /// import replaced the session under a still-running stream.
    pub fn append_response_content(
        &self,
        message_id: &str,
        model_key: &str,
        delta: &str,
    ) -> bool {
        let mut guard = self.current.lock().unwrap();
        let exists = guard
            .responses
            .get(message_id)
            .map(|slots| slots.contains_key(model_key))
            .unwrap_or(false);
        if !exists {
            return false;
        }
        let mut next = (**guard).clone();
        if let Some(slot) = next
            .responses
            .get_mut(message_id)
            .and_then(|slots| slots.get_mut(model_key))
        {
            slot.content.push_str(delta);
        }
        next.updated_at_ms = now_ms();
        *guard = Arc::new(next);
        true
    }

    pub fn finalize_response_success(
        &self,
        message_id: &str,
        model_key: &str,
        response_time_ms: u64,
        tokens: Option<u32>,
        cost: Option<f64>,
    ) {
        self.replace(|session| {
            if let Some(slot) = session
                .responses
                .get_mut(message_id)
                .and_then(|slots| slots.get_mut(model_key))
            {
                slot.loading = false;
                slot.error = None;
                slot.response_time_ms = Some(response_time_ms);
                slot.tokens = tokens;
                slot.cost = cost;
            }
        });
    }

    /// Marks a slot failed; partial content accumulated before the
    /// failure stays in place.
    pub fn finalize_response_error(&self, message_id: &str, model_key: &str, error: &str) {
        self.replace(|session| {
            if let Some(slot) = session
                .responses
                .get_mut(message_id)
                .and_then(|slots| slots.get_mut(model_key))
            {
                slot.loading = false;
                slot.error = Some(error.to_string());
            }
        });
    }

    pub fn set_title(&self, title: &str) {
        self.replace(|session| session.title = Some(title.to_string()));
    }

    pub fn set_selected_models(&self, models: Vec<String>) {
        self.replace(|session| session.selected_models = models);
    }

    pub fn set_system_prompt(&self, prompt: Option<String>) {
        self.replace(|session| session.system_prompt = prompt);
    }
}

pub fn set_event_sink(session_id: &str, sink: SessionEventSink) -> bool {
    if let Ok(manager) = SESSION_MANAGER.lock() {
        if let Some(ctx) = manager.get(session_id) {
            if let Ok(mut guard) = ctx.event_sink.lock() {
                *guard = Some(sink);
            }
            if let Ok(mut seq) = ctx.event_seq.lock() {
                *seq = 0;
            }
            return true;
        }
    }
    false
}

pub fn clear_event_sink(session_id: &str) {
    if let Ok(manager) = SESSION_MANAGER.lock() {
        if let Some(ctx) = manager.get(session_id) {
            if let Ok(mut guard) = ctx.event_sink.lock() {
                *guard = None;
            }
        }
    }
}

/// Pushes an event to the session's subscriber, stamping the per-session
/// sequence number. Non-blocking first; a full JS queue degrades to one
/// blocking retry rather than silently dropping the event.
pub fn emit_event(session_id: &str, mut event: CoreEvent) {
    if let Ok(manager) = SESSION_MANAGER.lock() {
        if let Some(ctx) = manager.get(session_id) {
            if let Ok(guard) = ctx.event_sink.lock() {
                if let Some(sink) = guard.as_ref() {
                    if event.seq.is_none() {
                        if let Ok(mut seq_guard) = ctx.event_seq.lock() {
                            *seq_guard = seq_guard.saturating_add(1);
                            event.seq = Some(*seq_guard);
                        }
                    }
                    let status = sink
                        .handler
                        .call(Ok(event.clone()), ThreadsafeFunctionCallMode::NonBlocking);
                    if status != Status::Ok {
                        let _ = sink.handler.call(Ok(event), ThreadsafeFunctionCallMode::Blocking);
                    }
                }
            }
        }
    }
}

pub fn emit_chunk(session_id: &str, message_id: &str, model_key: &str, text: &str) {
    let mut event = CoreEvent::new(session_id, CoreEventType::Chunk);
    event.message_id = Some(message_id.to_string());
    event.model_key = Some(model_key.to_string());
    event.text = Some(text.to_string());
    emit_event(session_id, event);
}

pub fn emit_slot_start(session_id: &str, message_id: &str, model_key: &str) {
    let mut event = CoreEvent::new(session_id, CoreEventType::SlotStart);
    event.message_id = Some(message_id.to_string());
    event.model_key = Some(model_key.to_string());
    emit_event(session_id, event);
}

pub fn emit_slot_end(
    session_id: &str,
    message_id: &str,
    model_key: &str,
    response_time_ms: u64,
    tokens: Option<u32>,
    cost: Option<f64>,
) {
    let mut event = CoreEvent::new(session_id, CoreEventType::SlotEnd);
    event.message_id = Some(message_id.to_string());
    event.model_key = Some(model_key.to_string());
    event.response_time_ms = Some(response_time_ms as i64);
    event.tokens = tokens;
    event.cost = cost;
    event.success = Some(true);
    emit_event(session_id, event);
}

pub fn emit_slot_error(session_id: &str, message_id: &str, model_key: &str, error: &str) {
    let mut event = CoreEvent::new(session_id, CoreEventType::SlotError);
    event.message_id = Some(message_id.to_string());
    event.model_key = Some(model_key.to_string());
    event.error_message = Some(error.to_string());
    event.success = Some(false);
    emit_event(session_id, event);
}

pub fn emit_dropped(session_id: &str, model_key: &str, reason: &str) {
    let mut event = CoreEvent::new(session_id, CoreEventType::Dropped);
    event.model_key = Some(model_key.to_string());
    event.error_message = Some(reason.to_string());
    emit_event(session_id, event);
}

pub fn emit_title(session_id: &str, title: &str) {
    let mut event = CoreEvent::new(session_id, CoreEventType::Title);
    event.text = Some(title.to_string());
    emit_event(session_id, event);
}

pub fn emit_end(session_id: &str, message_id: &str) {
    let mut event = CoreEvent::new(session_id, CoreEventType::End);
    event.message_id = Some(message_id.to_string());
    emit_event(session_id, event);
}
