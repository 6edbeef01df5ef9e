use std::sync::Arc;

use crate::llm::fanout::dispatch_user_turn;
use crate::llm::models::provider_handle::{AnyProviderClient, ProviderRegistry};
use crate::llm::models::scripted::ScriptedClient;
use crate::session::state::SessionStore;
use crate::session::types::Session;

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_selection(models: &[&str]) -> Arc<SessionStore> {
        let mut session = Session::new("sess_test_fanout".to_string());
        session.selected_models = models.iter().map(|m| m.to_string()).collect();
        Arc::new(SessionStore::new(session))
    }

    fn registry_of(entries: &[(&str, ScriptedClient)]) -> Arc<ProviderRegistry> {
        let mut registry = ProviderRegistry::default();
        for (key, client) in entries {
            registry.insert(key, AnyProviderClient::Scripted(client.clone()));
        }
        Arc::new(registry)
    }

    #[tokio::test]
    async fn deltas_accumulate_in_arrival_order() {
        let store = store_with_selection(&["deepseek:deepseek-chat"]);
        let registry = registry_of(&[(
            "deepseek:deepseek-chat",
            ScriptedClient::replying(&["He", "llo"]).with_tokens(12),
        )]);

        let outcome =
            dispatch_user_turn("sess_test_fanout", &store, &registry, "hi".to_string(), vec![])
                .await;

        assert_eq!(outcome.dispatched, vec!["deepseek:deepseek-chat"]);
        assert!(outcome.dropped.is_empty());
        let message_id = outcome.message_id.unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].content, "hi");

        let slot = &snapshot.responses[&message_id]["deepseek:deepseek-chat"];
        assert_eq!(slot.content, "Hello");
        assert!(!slot.loading);
        assert!(slot.error.is_none());
        assert_eq!(slot.tokens, Some(12));
        assert!(slot.cost.is_some());
        assert!(slot.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn one_failure_never_aborts_the_siblings() {
        let store = store_with_selection(&[
            "deepseek:deepseek-chat",
            "moonshot:moonshot-v1-8k",
            "aliyun:qwen-plus",
        ]);
        let registry = registry_of(&[
            ("deepseek:deepseek-chat", ScriptedClient::replying(&["A"])),
            (
                "moonshot:moonshot-v1-8k",
                ScriptedClient::failing_mid_stream(&["partial "], "connection reset"),
            ),
            ("aliyun:qwen-plus", ScriptedClient::replying(&["C"]).with_delay_ms(5)),
        ]);

        let outcome =
            dispatch_user_turn("sess_test_fanout", &store, &registry, "go".to_string(), vec![])
                .await;
        let message_id = outcome.message_id.unwrap();
        assert_eq!(outcome.dispatched.len(), 3);

        let snapshot = store.snapshot();
        let slots = &snapshot.responses[&message_id];

        let ok_a = &slots["deepseek:deepseek-chat"];
        assert_eq!(ok_a.content, "A");
        assert!(ok_a.error.is_none());

        let failed = &slots["moonshot:moonshot-v1-8k"];
        assert!(!failed.loading);
        assert_eq!(failed.content, "partial ");
        assert!(failed.error.as_deref().unwrap().contains("connection reset"));

        let ok_c = &slots["aliyun:qwen-plus"];
        assert_eq!(ok_c.content, "C");
        assert!(ok_c.error.is_none());
    }

    #[tokio::test]
    async fn connect_failure_settles_the_slot() {
        let store = store_with_selection(&["deepseek:deepseek-chat"]);
        let registry = registry_of(&[(
            "deepseek:deepseek-chat",
            ScriptedClient::failing_on_connect("invalid key"),
        )]);

        let outcome =
            dispatch_user_turn("sess_test_fanout", &store, &registry, "hi".to_string(), vec![])
                .await;
        let message_id = outcome.message_id.unwrap();

        let snapshot = store.snapshot();
        let slot = &snapshot.responses[&message_id]["deepseek:deepseek-chat"];
        assert!(!slot.loading);
        assert_eq!(slot.content, "");
        assert!(slot.error.as_deref().unwrap().contains("invalid key"));
    }

    #[tokio::test]
    async fn unconfigured_models_are_dropped_up_front() {
        let store = store_with_selection(&["deepseek:deepseek-chat", "moonshot:moonshot-v1-8k"]);
        let registry = registry_of(&[("deepseek:deepseek-chat", ScriptedClient::replying(&["ok"]))]);

        let outcome =
            dispatch_user_turn("sess_test_fanout", &store, &registry, "hi".to_string(), vec![])
                .await;
        let message_id = outcome.message_id.unwrap();

        assert_eq!(outcome.dispatched, vec!["deepseek:deepseek-chat"]);
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].model_key, "moonshot:moonshot-v1-8k");
        assert!(outcome.dropped[0].reason.contains("moonshot"));

        // No slot is ever created for a dropped model.
        let snapshot = store.snapshot();
        let slots = &snapshot.responses[&message_id];
        assert_eq!(slots.len(), 1);
        assert!(!slots.contains_key("moonshot:moonshot-v1-8k"));
    }

    #[tokio::test]
    async fn empty_selection_still_records_the_message() {
        let store = store_with_selection(&[]);
        let registry = registry_of(&[]);

        let outcome = dispatch_user_turn(
            "sess_test_fanout",
            &store,
            &registry,
            "lonely".to_string(),
            vec![],
        )
        .await;

        assert!(outcome.dispatched.is_empty());
        assert!(outcome.dropped.is_empty());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].content, "lonely");
        assert!(snapshot.responses.is_empty());
    }
}
