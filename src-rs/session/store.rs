use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::types::{now_ms, Session};

pub const SESSION_SNAPSHOT_VERSION: u16 = 1;

/// Versioned on-disk form of a session. The session fields are
/// flattened so the snapshot file reads as the session itself plus a
/// version stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u16,
    #[serde(flatten)]
    pub session: Session,
}

/// Small sidecar record so session listing never has to parse full
/// snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub version: u16,
    pub session_id: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub message_count: usize,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub selected_models: Vec<String>,
}

impl SessionMeta {
    fn from_session(session: &Session) -> Self {
        Self {
            version: SESSION_SNAPSHOT_VERSION,
            session_id: session.id.clone(),
            created_at_ms: session.created_at_ms,
            updated_at_ms: session.updated_at_ms,
            message_count: session.messages.len(),
            title: session.title.clone(),
            selected_models: session.selected_models.clone(),
        }
    }
}

pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() {
        anyhow::bail!("session_id is empty");
    }
    if session_id.len() > 128 {
        anyhow::bail!("session_id too long");
    }
    let ok = session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        anyhow::bail!("invalid session_id");
    }
    Ok(())
}

fn sessions_root_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chorus").join("sessions"))
}

fn session_dir(session_id: &str) -> Result<PathBuf> {
    validate_session_id(session_id)?;
    let root = sessions_root_dir().context("failed to determine home directory")?;
    Ok(root.join(session_id))
}

fn snapshot_path(session_id: &str) -> Result<PathBuf> {
    Ok(session_dir(session_id)?.join("snapshot.json"))
}

fn meta_path(session_id: &str) -> Result<PathBuf> {
    Ok(session_dir(session_id)?.join("meta.json"))
}

fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .context("missing parent directory for atomic write")?;
    if !parent.exists() {
        fs::create_dir_all(parent).context("failed to create session directory")?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let tmp_path = parent.join(format!("{file_name}.tmp.{}", now_ms()));

    fs::write(&tmp_path, content).context("failed to write tmp file")?;
    fs::rename(&tmp_path, path).context("failed to rename tmp file")?;
    Ok(())
}

pub fn load_snapshot(session_id: &str) -> Result<Option<Session>> {
    let path = snapshot_path(session_id)?;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).context("failed to read snapshot file")?;
    let snapshot: SessionSnapshot =
        serde_json::from_str(&content).context("failed to parse snapshot file")?;
    if snapshot.version != SESSION_SNAPSHOT_VERSION {
        return Ok(None);
    }
    Ok(Some(snapshot.session))
}

pub fn save_snapshot(session: &Session) -> Result<()> {
    let snapshot = SessionSnapshot {
        version: SESSION_SNAPSHOT_VERSION,
        session: session.clone(),
    };
    let snapshot_json =
        serde_json::to_string_pretty(&snapshot).context("failed to serialize snapshot")?;
    atomic_write(&snapshot_path(&session.id)?, &snapshot_json)?;

    let meta = SessionMeta::from_session(session);
    let meta_json = serde_json::to_string_pretty(&meta).context("failed to serialize meta")?;
    atomic_write(&meta_path(&session.id)?, &meta_json)?;
    Ok(())
}

pub fn load_meta(session_id: &str) -> Result<Option<SessionMeta>> {
    let path = meta_path(session_id)?;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).context("failed to read meta file")?;
    let meta: SessionMeta = serde_json::from_str(&content).context("failed to parse meta file")?;
    if meta.version != SESSION_SNAPSHOT_VERSION {
        return Ok(None);
    }
    Ok(Some(meta))
}

pub fn list_saved_sessions() -> Result<Vec<SessionMeta>> {
    let root = sessions_root_dir().context("failed to determine home directory")?;
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut metas: Vec<SessionMeta> = Vec::new();
    for entry in fs::read_dir(&root).context("failed to read sessions directory")? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let session_id = match path.file_name().and_then(|n| n.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        if validate_session_id(&session_id).is_err() {
            continue;
        }

        match load_meta(&session_id) {
            Ok(Some(meta)) => metas.push(meta),
            Ok(None) => {
                if let Ok(Some(session)) = load_snapshot(&session_id) {
                    metas.push(SessionMeta::from_session(&session));
                }
            }
            Err(_) => {}
        }
    }

    metas.sort_by(|a, b| b.session_id.cmp(&a.session_id));
    Ok(metas)
}

/// Serializes a session for export. Titles are mandatory in the export
/// format, so an untitled session gets one derived from its first user
/// message.
pub fn export_session(session: &Session) -> Result<String> {
    let mut session = session.clone();
    if session.title.is_none() {
        let derived = session
            .messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| crate::llm::title::placeholder_title(&m.content))
            .unwrap_or_else(|| "Untitled session".to_string());
        session.title = Some(derived);
    }
    let snapshot = SessionSnapshot {
        version: SESSION_SNAPSHOT_VERSION,
        session,
    };
    serde_json::to_string_pretty(&snapshot).context("failed to serialize export")
}

/// Parses an exported session, validating the fields the format makes
/// mandatory before anything is accepted.
pub fn import_session(json: &str) -> Result<Session> {
    let raw: Value = serde_json::from_str(json).context("failed to parse import")?;
    let version = raw
        .get("version")
        .and_then(|v| v.as_u64())
        .context("import missing version")?;
    if version != SESSION_SNAPSHOT_VERSION as u64 {
        anyhow::bail!("unsupported snapshot version: {}", version);
    }
    if raw.get("title").map(|t| t.is_null()).unwrap_or(true) {
        anyhow::bail!("import missing title");
    }
    if !raw.get("messages").map(|m| m.is_array()).unwrap_or(false) {
        anyhow::bail!("import missing messages");
    }

    let snapshot: SessionSnapshot =
        serde_json::from_value(raw).context("failed to parse import")?;
    validate_session_id(&snapshot.session.id)?;
    Ok(snapshot.session)
}
