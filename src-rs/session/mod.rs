pub mod context;
pub mod id;
pub mod manager;
pub mod state;
pub mod store;
pub mod types;

pub use context::{SessionContext, SessionEventSink};
pub use id::{generate_message_id, generate_session_id};
pub use manager::{store_for, SessionManager, SESSION_MANAGER};
pub use state::{
    clear_event_sink, emit_chunk, emit_dropped, emit_end, emit_slot_end, emit_slot_error,
    emit_slot_start, emit_title, set_event_sink, SessionStore,
};
pub use types::{ChatMessage, CoreEvent, CoreEventType, ModelResponse, Session};
