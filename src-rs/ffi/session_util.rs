use napi::bindgen_prelude::*;
use napi_derive::napi;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::cons::provider_cons::{split_model_key, LLMProvider};
use crate::llm::fanout;
use crate::llm::models::provider_base::ImageAttachment;
use crate::llm::models::provider_handle::ProviderRegistry;
use crate::llm::title;
use crate::llm::utils::probe;
use crate::session::types::Session;
use crate::session::{emit_title, generate_session_id, store, store_for, SESSION_MANAGER};

#[napi(object)]
pub struct ImageInput {
    #[napi(js_name = "mediaType")]
    pub media_type: Option<String>,
    pub data: Option<String>,
    #[napi(js_name = "fileName")]
    pub file_name: Option<String>,
}

#[napi(object)]
pub struct DroppedModelInfo {
    #[napi(js_name = "modelKey")]
    pub model_key: String,
    pub reason: String,
}

#[napi(object)]
pub struct DispatchSummary {
    #[napi(js_name = "messageId")]
    pub message_id: Option<String>,
    pub dispatched: Vec<String>,
    pub dropped: Vec<DroppedModelInfo>,
}

#[napi(object)]
pub struct UiChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    #[napi(js_name = "timestampMs")]
    pub timestamp_ms: i64,
    #[napi(js_name = "imageCount")]
    pub image_count: u32,
}

#[napi(object)]
pub struct UiModelResponse {
    #[napi(js_name = "modelKey")]
    pub model_key: String,
    pub content: String,
    pub loading: bool,
    pub error: Option<String>,
    #[napi(js_name = "responseTimeMs")]
    pub response_time_ms: Option<i64>,
    pub tokens: Option<u32>,
    pub cost: Option<f64>,
}

#[napi(object)]
pub struct SavedSessionInfo {
    #[napi(js_name = "sessionId")]
    pub session_id: String,
    #[napi(js_name = "createdAtMs")]
    pub created_at_ms: i64,
    #[napi(js_name = "updatedAtMs")]
    pub updated_at_ms: i64,
    #[napi(js_name = "messageCount")]
    pub message_count: u32,
    pub title: Option<String>,
    #[napi(js_name = "selectedModels")]
    pub selected_models: Vec<String>,
}

#[napi(object)]
pub struct AvailableModel {
    #[napi(js_name = "modelKey")]
    pub model_key: String,
    pub provider: String,
    pub brand: Option<String>,
    pub configured: bool,
    pub vision: bool,
}

#[napi(object)]
pub struct UsageTotals {
    #[napi(js_name = "totalTokens")]
    pub total_tokens: i64,
    #[napi(js_name = "totalCost")]
    pub total_cost: f64,
}

#[napi(object)]
pub struct ProbeInfo {
    #[napi(js_name = "modelKey")]
    pub model_key: String,
    #[napi(js_name = "latencyMs")]
    pub latency_ms: i64,
    pub reply: String,
}

pub(crate) fn images_from_input(images: Option<Vec<ImageInput>>) -> Vec<ImageAttachment> {
    images
        .unwrap_or_default()
        .into_iter()
        .filter_map(|img| match (img.media_type, img.data, img.file_name) {
            (Some(media_type), Some(data), _) => {
                Some(ImageAttachment::Base64 { media_type, data })
            }
            (_, _, Some(name)) => Some(ImageAttachment::FileTag { name }),
            _ => None,
        })
        .collect()
}

fn load_config() -> Result<AppConfig> {
    AppConfig::load().map_err(|e| Error::from_reason(format!("Failed to load config: {}", e)))
}

/// Opens (or creates) a session and registers it with the manager. A
/// saved snapshot wins over a fresh state; a fresh state inherits the
/// runtime model selection and system prompt.
pub(crate) fn open_session(session_id: Option<String>) -> Result<String> {
    let session_id = match session_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => generate_session_id(),
    };
    store::validate_session_id(&session_id)
        .map_err(|e| Error::from_reason(format!("Invalid session id: {}", e)))?;

    {
        let manager = SESSION_MANAGER
            .lock()
            .map_err(|_| Error::from_reason("Failed to lock session manager"))?;
        if manager.get(&session_id).is_some() {
            return Ok(session_id);
        }
    }

    let session = match store::load_snapshot(&session_id)
        .map_err(|e| Error::from_reason(format!("Failed to load session snapshot: {}", e)))?
    {
        Some(saved) => saved,
        None => {
            let config = load_config()?;
            let mut session = Session::new(session_id.clone());
            session.selected_models = config.runtime.selected_models.clone();
            session.system_prompt = config.runtime.system_prompt.clone();
            session
        }
    };

    let mut manager = SESSION_MANAGER
        .lock()
        .map_err(|_| Error::from_reason("Failed to lock session manager"))?;
    manager.add(session);
    Ok(session_id)
}

pub(crate) fn close_session(session_id: &str) -> Result<()> {
    persist_session(session_id)?;
    let mut manager = SESSION_MANAGER
        .lock()
        .map_err(|_| Error::from_reason("Failed to lock session manager"))?;
    manager.remove(session_id);
    Ok(())
}

pub(crate) fn persist_session(session_id: &str) -> Result<()> {
    let session_store = store_for(session_id).map_err(Error::from)?;
    let snapshot = session_store.snapshot();
    store::save_snapshot(&snapshot)
        .map_err(|e| Error::from_reason(format!("Failed to persist session snapshot: {}", e)))
}

/// Full send path: fan the prompt out, then settle the ambient state
/// (title, usage totals, snapshot) once every stream is done.
pub(crate) async fn send_message(
    session_id: &str,
    prompt: String,
    images: Option<Vec<ImageInput>>,
) -> Result<DispatchSummary> {
    let session_store = store_for(session_id).map_err(Error::from)?;
    let pre_dispatch = session_store.snapshot();
    let needs_title =
        pre_dispatch.title.is_none() && !pre_dispatch.messages.iter().any(|m| m.role == "user");

    let mut config = load_config()?;
    let registry = Arc::new(ProviderRegistry::from_config(
        &config,
        pre_dispatch.system_prompt.clone(),
    ));

    if needs_title {
        let registry = Arc::clone(&registry);
        let store_handle = Arc::clone(&session_store);
        let session_id = session_id.to_string();
        let prompt = prompt.clone();
        tokio::spawn(async move {
            let generated = title::generate_title(registry, prompt).await;
            store_handle.set_title(&generated);
            emit_title(&session_id, &generated);
            let _ = store::save_snapshot(&store_handle.snapshot());
        });
    }

    let outcome = fanout::dispatch_user_turn(
        session_id,
        &session_store,
        &registry,
        prompt,
        images_from_input(images),
    )
    .await;

    if let Some(message_id) = &outcome.message_id {
        let settled = session_store.snapshot();
        if let Some(slots) = settled.responses.get(message_id) {
            let tokens: u64 = slots.values().filter_map(|s| s.tokens).map(u64::from).sum();
            let cost: f64 = slots.values().filter_map(|s| s.cost).sum();
            if tokens > 0 || cost > 0.0 {
                config.add_usage(tokens, cost);
                if let Err(e) = config.save_runtime() {
                    log::warn!("failed to save usage totals: {}", e);
                }
            }
        }
    }
    persist_session(session_id)?;

    Ok(DispatchSummary {
        message_id: outcome.message_id,
        dispatched: outcome.dispatched,
        dropped: outcome
            .dropped
            .into_iter()
            .map(|d| DroppedModelInfo {
                model_key: d.model_key,
                reason: d.reason,
            })
            .collect(),
    })
}

pub(crate) fn get_history(session_id: &str) -> Result<Vec<UiChatMessage>> {
    let session_store = store_for(session_id).map_err(Error::from)?;
    let snapshot = session_store.snapshot();
    Ok(snapshot
        .messages
        .iter()
        .map(|m| UiChatMessage {
            id: m.id.clone(),
            role: m.role.clone(),
            content: m.content.clone(),
            timestamp_ms: m.timestamp_ms,
            image_count: m.images.len() as u32,
        })
        .collect())
}

pub(crate) fn get_responses(session_id: &str, message_id: &str) -> Result<Vec<UiModelResponse>> {
    let session_store = store_for(session_id).map_err(Error::from)?;
    let snapshot = session_store.snapshot();
    let mut responses: Vec<UiModelResponse> = snapshot
        .responses
        .get(message_id)
        .map(|slots| {
            slots
                .values()
                .map(|s| UiModelResponse {
                    model_key: s.model_key.clone(),
                    content: s.content.clone(),
                    loading: s.loading,
                    error: s.error.clone(),
                    response_time_ms: s.response_time_ms.map(|t| t as i64),
                    tokens: s.tokens,
                    cost: s.cost,
                })
                .collect()
        })
        .unwrap_or_default();
    responses.sort_by(|a, b| a.model_key.cmp(&b.model_key));
    Ok(responses)
}

/// Replaces the session's model selection. Keys must parse and point at
/// models the configuration lists; the selection also becomes the
/// runtime default for new sessions.
pub(crate) fn set_selected_models(session_id: &str, models: Vec<String>) -> Result<()> {
    let mut config = load_config()?;
    let known = config.model_keys();
    for key in &models {
        split_model_key(key).map_err(Error::from)?;
        if !known.contains(key) {
            return Err(Error::from_reason(format!("unknown model key: {}", key)));
        }
    }

    let session_store = store_for(session_id).map_err(Error::from)?;
    session_store.set_selected_models(models.clone());

    config.runtime.selected_models = models;
    config
        .save_runtime()
        .map_err(|e| Error::from_reason(format!("Failed to save runtime config: {}", e)))?;
    persist_session(session_id)
}

pub(crate) fn set_system_prompt(session_id: &str, prompt: Option<String>) -> Result<()> {
    let prompt = prompt.and_then(|p| {
        let p = p.trim().to_string();
        if p.is_empty() {
            None
        } else {
            Some(p)
        }
    });

    let session_store = store_for(session_id).map_err(Error::from)?;
    session_store.set_system_prompt(prompt.clone());

    let mut config = load_config()?;
    config.runtime.system_prompt = prompt;
    config
        .save_runtime()
        .map_err(|e| Error::from_reason(format!("Failed to save runtime config: {}", e)))?;
    persist_session(session_id)
}

pub(crate) fn export_session(session_id: &str) -> Result<String> {
    let session_store = store_for(session_id).map_err(Error::from)?;
    let snapshot = session_store.snapshot();
    store::export_session(&snapshot)
        .map_err(|e| Error::from_reason(format!("Failed to export session: {}", e)))
}

/// Imports an exported session, replacing in-memory state if the id is
/// already open, and persists it.
pub(crate) fn import_session(json: String) -> Result<String> {
    let session = store::import_session(&json)
        .map_err(|e| Error::from_reason(format!("Failed to import session: {}", e)))?;
    let session_id = session.id.clone();

    {
        let mut manager = SESSION_MANAGER
            .lock()
            .map_err(|_| Error::from_reason("Failed to lock session manager"))?;
        if let Some(ctx) = manager.get(&session_id) {
            ctx.store.reset(session.clone());
        } else {
            manager.add(session.clone());
        }
    }

    store::save_snapshot(&session)
        .map_err(|e| Error::from_reason(format!("Failed to persist session snapshot: {}", e)))?;
    Ok(session_id)
}

pub(crate) fn get_saved_sessions() -> Result<Vec<SavedSessionInfo>> {
    let metas = store::list_saved_sessions()
        .map_err(|e| Error::from_reason(format!("Failed to list saved sessions: {}", e)))?;
    Ok(metas
        .into_iter()
        .take(15)
        .map(|m| SavedSessionInfo {
            session_id: m.session_id,
            created_at_ms: m.created_at_ms,
            updated_at_ms: m.updated_at_ms,
            message_count: m.message_count as u32,
            title: m.title,
            selected_models: m.selected_models,
        })
        .collect())
}

pub(crate) fn get_sessions() -> Result<Vec<String>> {
    let manager = SESSION_MANAGER
        .lock()
        .map_err(|_| Error::from_reason("Failed to lock session manager"))?;
    Ok(manager.list_ids())
}

pub(crate) async fn probe_model(model_key: &str) -> Result<ProbeInfo> {
    let config = load_config()?;
    let registry = ProviderRegistry::from_config(&config, None);
    let result = probe::probe_model(&registry, model_key)
        .await
        .map_err(Error::from)?;
    Ok(ProbeInfo {
        model_key: result.model_key,
        latency_ms: result.latency_ms as i64,
        reply: result.reply,
    })
}

pub(crate) fn list_available_models() -> Result<Vec<AvailableModel>> {
    let config = load_config()?;
    let mut models = Vec::new();
    for provider_cfg in &config.providers {
        let Some(provider) = LLMProvider::from_name(&provider_cfg.name) else {
            continue;
        };
        let configured = !provider_cfg.api_key.trim().is_empty()
            && provider.validate_api_key(&provider_cfg.api_key).is_ok();
        for model in &provider_cfg.models {
            models.push(AvailableModel {
                model_key: format!("{}:{}", provider.provider_name(), model),
                provider: provider.provider_name().to_string(),
                brand: provider_cfg.brand.clone(),
                configured,
                vision: provider.supports_vision(),
            });
        }
    }
    Ok(models)
}

pub(crate) fn set_api_key(provider: String, api_key: String) -> Result<()> {
    let provider = LLMProvider::from_name(&provider)
        .ok_or_else(|| Error::from_reason(format!("unknown provider: {}", provider)))?;
    let mut config = load_config()?;
    config.set_api_key(provider, &api_key).map_err(Error::from)?;
    config
        .save_user_patch()
        .map_err(|e| Error::from_reason(format!("Failed to save config: {}", e)))
}

pub(crate) fn get_usage_totals() -> Result<UsageTotals> {
    let config = load_config()?;
    Ok(UsageTotals {
        total_tokens: config.runtime.total_tokens as i64,
        total_cost: config.runtime.total_cost,
    })
}

pub(crate) fn clear_api_key(provider: String) -> Result<()> {
    let provider = LLMProvider::from_name(&provider)
        .ok_or_else(|| Error::from_reason(format!("unknown provider: {}", provider)))?;
    let mut config = load_config()?;
    config.clear_api_key(provider);
    config
        .save_user_patch()
        .map_err(|e| Error::from_reason(format!("Failed to save config: {}", e)))
}
