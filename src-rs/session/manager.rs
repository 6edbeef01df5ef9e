use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use lazy_static::lazy_static;

use super::context::SessionContext;
use super::state::SessionStore;
use super::types::Session;
use crate::errors::CoreError;

pub struct SessionManager {
    sessions: HashMap<String, SessionContext>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionContext> {
        self.sessions.get(session_id)
    }

    pub fn add(&mut self, session: Session) -> &SessionContext {
        let session_id = session.id.clone();
        let ctx = SessionContext::new(session);
        self.sessions.insert(session_id.clone(), ctx);
        self.sessions.get(&session_id).expect("Just inserted")
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionContext> {
        self.sessions.remove(session_id)
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref SESSION_MANAGER: StdMutex<SessionManager> = StdMutex::new(SessionManager::new());
}

/// Store handle for an open session.
pub fn store_for(session_id: &str) -> Result<Arc<SessionStore>, CoreError> {
    let manager = SESSION_MANAGER
        .lock()
        .map_err(|_| CoreError::Configuration("session manager unavailable".to_string()))?;
    manager
        .get(session_id)
        .map(|ctx| Arc::clone(&ctx.store))
        .ok_or_else(|| CoreError::Configuration(format!("unknown session: {}", session_id)))
}
