use napi::bindgen_prelude::*;
use napi::JsFunction;
use napi_derive::napi;

use crate::session::context::SessionEventSink;
use crate::session::{clear_event_sink, generate_session_id, set_event_sink};

use super::session_util::{
    self, AvailableModel, DispatchSummary, ImageInput, ProbeInfo, SavedSessionInfo, UiChatMessage,
    UiModelResponse, UsageTotals,
};

#[napi]
pub fn create_session_id() -> String {
    generate_session_id()
}

#[napi]
pub struct Session {
    session_id: String,
}

#[napi]
impl Session {
    /// Opens an existing session (restoring its saved snapshot if one
    /// exists) or creates a fresh one when the id is blank.
    #[napi(factory)]
    pub fn open(session_id: Option<String>) -> Result<Self> {
        let session_id = session_util::open_session(session_id)?;
        Ok(Self { session_id })
    }

    #[napi(getter)]
    pub fn id(&self) -> String {
        self.session_id.clone()
    }

    #[napi]
    pub fn subscribe(&self, on_event: JsFunction) -> Result<()> {
        let tsfn = on_event.create_threadsafe_function(0, |ctx| Ok(vec![ctx.value]))?;

        let sink = SessionEventSink { handler: tsfn };

        if !set_event_sink(&self.session_id, sink) {
            return Err(Error::from_reason("Session not found"));
        }

        Ok(())
    }

    #[napi]
    pub fn unsubscribe(&self) -> Result<()> {
        clear_event_sink(&self.session_id);
        Ok(())
    }

    /// Sends a user turn to every selected model. Resolves once all
    /// streams have settled; incremental output arrives through the
    /// subscribed event callback.
    #[napi]
    pub async fn send_message(
        &self,
        prompt: String,
        images: Option<Vec<ImageInput>>,
    ) -> Result<DispatchSummary> {
        session_util::send_message(&self.session_id, prompt, images).await
    }

    #[napi]
    pub fn get_history(&self) -> Result<Vec<UiChatMessage>> {
        session_util::get_history(&self.session_id)
    }

    #[napi]
    pub fn get_responses(&self, message_id: String) -> Result<Vec<UiModelResponse>> {
        session_util::get_responses(&self.session_id, &message_id)
    }

    #[napi]
    pub fn set_selected_models(&self, models: Vec<String>) -> Result<()> {
        session_util::set_selected_models(&self.session_id, models)
    }

    #[napi]
    pub fn set_system_prompt(&self, prompt: Option<String>) -> Result<()> {
        session_util::set_system_prompt(&self.session_id, prompt)
    }

    #[napi]
    pub fn export_session(&self) -> Result<String> {
        session_util::export_session(&self.session_id)
    }

    #[napi]
    pub fn close(&self) -> Result<()> {
        session_util::close_session(&self.session_id)
    }

    #[napi]
    pub async fn probe_model(&self, model_key: String) -> Result<ProbeInfo> {
        session_util::probe_model(&model_key).await
    }

    #[napi]
    pub fn import_session(json: String) -> Result<String> {
        session_util::import_session(json)
    }

    #[napi]
    pub fn get_sessions() -> Result<Vec<String>> {
        session_util::get_sessions()
    }

    #[napi]
    pub fn get_saved_sessions() -> Result<Vec<SavedSessionInfo>> {
        session_util::get_saved_sessions()
    }
}

#[napi]
pub fn list_available_models() -> Result<Vec<AvailableModel>> {
    session_util::list_available_models()
}

#[napi]
pub fn set_api_key(provider: String, api_key: String) -> Result<()> {
    session_util::set_api_key(provider, api_key)
}

#[napi]
pub fn clear_api_key(provider: String) -> Result<()> {
    session_util::clear_api_key(provider)
}

#[napi]
pub fn get_usage_totals() -> Result<UsageTotals> {
    session_util::get_usage_totals()
}
