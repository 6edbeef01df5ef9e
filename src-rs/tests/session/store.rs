use crate::session::store::*;
use crate::session::types::{now_ms, ChatMessage, ModelResponse, Session};
use std::env;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session(id: &str) -> Session {
        let mut session = Session::new(id.to_string());
        session.title = Some("Borrowing basics".to_string());
        session.system_prompt = Some("be brief".to_string());
        session.selected_models = vec!["deepseek:deepseek-chat".to_string()];
        let message = ChatMessage {
            id: "msg_1".to_string(),
            role: "user".to_string(),
            content: "hello".to_string(),
            timestamp_ms: now_ms(),
            images: vec![],
        };
        session.messages.push(message);
        let mut slot = ModelResponse::pending("deepseek:deepseek-chat");
        slot.content = "hi there".to_string();
        slot.loading = false;
        session
            .responses
            .entry("msg_1".to_string())
            .or_default()
            .insert("deepseek:deepseek-chat".to_string(), slot);
        session
    }

    fn with_temp_home(test: impl FnOnce()) {
        let original_home = env::var("HOME").ok();
        let tmp_home = env::temp_dir().join(format!("chorus-test-home-{}", now_ms()));
        std::fs::create_dir_all(&tmp_home).unwrap();
        env::set_var("HOME", &tmp_home);

        test();

        match original_home {
            Some(v) => env::set_var("HOME", v),
            None => env::remove_var("HOME"),
        }
    }

    #[test]
    fn validate_session_id_allows_simple_ids() {
        assert!(validate_session_id("abc").is_ok());
        assert!(validate_session_id("abc-DEF_123").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../x").is_err());
        assert!(validate_session_id("a b").is_err());
    }

    #[test]
    fn snapshot_roundtrip() {
        with_temp_home(|| {
            let session = sample_session("test_session_1");
            save_snapshot(&session).unwrap();

            let loaded = load_snapshot("test_session_1").unwrap().unwrap();
            assert_eq!(loaded.id, "test_session_1");
            assert_eq!(loaded.messages.len(), 1);
            assert_eq!(loaded.messages[0].content, "hello");
            let slot = &loaded.responses["msg_1"]["deepseek:deepseek-chat"];
            assert_eq!(slot.content, "hi there");
            assert_eq!(loaded.system_prompt.as_deref(), Some("be brief"));
        });
    }

    #[test]
    fn meta_sidecar_tracks_the_snapshot() {
        with_temp_home(|| {
            let session = sample_session("test_session_meta");
            save_snapshot(&session).unwrap();

            let meta = load_meta("test_session_meta").unwrap().unwrap();
            assert_eq!(meta.session_id, "test_session_meta");
            assert_eq!(meta.message_count, 1);
            assert_eq!(meta.title.as_deref(), Some("Borrowing basics"));

            let listed = list_saved_sessions().unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].session_id, "test_session_meta");
        });
    }

    #[test]
    fn missing_snapshot_loads_as_none() {
        with_temp_home(|| {
            assert!(load_snapshot("never_saved").unwrap().is_none());
        });
    }

    #[test]
    fn export_import_roundtrip() {
        let session = sample_session("test_session_export");
        let json = export_session(&session).unwrap();

        let imported = import_session(&json).unwrap();
        assert_eq!(imported.id, "test_session_export");
        assert_eq!(imported.title.as_deref(), Some("Borrowing basics"));
        assert_eq!(imported.messages.len(), 1);
        assert_eq!(
            imported.responses["msg_1"]["deepseek:deepseek-chat"].content,
            "hi there"
        );
        assert_eq!(imported.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn export_materializes_a_title_for_untitled_sessions() {
        let mut session = sample_session("test_session_untitled");
        session.title = None;
        let json = export_session(&session).unwrap();

        let imported = import_session(&json).unwrap();
        assert_eq!(imported.title.as_deref(), Some("hello"));
    }

    #[test]
    fn import_rejects_missing_mandatory_fields() {
        assert!(import_session("not json").is_err());
        assert!(import_session("{}").is_err());
        // Version present but no title.
        assert!(import_session(r#"{"version":1,"id":"x","messages":[]}"#).is_err());
        // Title present but no messages.
        assert!(import_session(r#"{"version":1,"id":"x","title":"t"}"#).is_err());
        // Wrong version.
        assert!(import_session(r#"{"version":99,"id":"x","title":"t","messages":[]}"#).is_err());
    }
}
