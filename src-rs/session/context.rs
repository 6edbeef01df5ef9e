use std::sync::{Arc, Mutex as StdMutex};

use napi::threadsafe_function::{ErrorStrategy, ThreadsafeFunction};

use super::state::SessionStore;
use super::types::{CoreEvent, Session};

pub struct SessionEventSink {
    pub handler: ThreadsafeFunction<CoreEvent, ErrorStrategy::CalleeHandled>,
}

/// Per-session runtime state tracked by the manager: the live store
/// plus the JS subscriber and its event counter.
pub struct SessionContext {
    pub session_id: String,
    pub store: Arc<SessionStore>,
    pub event_sink: Arc<StdMutex<Option<SessionEventSink>>>,
    pub event_seq: Arc<StdMutex<i64>>,
}

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self {
            session_id: session.id.clone(),
            store: Arc::new(SessionStore::new(session)),
            event_sink: Arc::new(StdMutex::new(None)),
            event_seq: Arc::new(StdMutex::new(0)),
        }
    }
}
