use crate::llm::models::claude_gateway::*;
use crate::llm::models::provider_base::{ImageAttachment, Message};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ClaudeGatewayClient {
        ClaudeGatewayClient::new(
            "https://gateway.example.invalid".to_string(),
            "sk-ant-test".to_string(),
            "claude-sonnet-4-20250514".to_string(),
        )
    }

    #[test]
    fn text_delta_comes_from_content_block_delta() {
        let event = json!({
            "type": "content_block_delta",
            "delta": { "type": "text_delta", "text": "Hel" }
        });
        assert_eq!(extract_text_from_anthropic_event(&event), Some("Hel"));

        let other = json!({ "type": "content_block_start" });
        assert_eq!(extract_text_from_anthropic_event(&other), None);
    }

    #[test]
    fn system_messages_merge_into_top_level_field() {
        let c = client().with_system_prompt(Some("be brief".to_string()));
        let body = c.build_request_body(
            vec![
                Message::text("system", "extra rules"),
                Message::text("user", "hi"),
            ],
            true,
        );
        assert_eq!(body["system"], "be brief\n\nextra rules");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn no_system_field_without_prompt() {
        let body = client().build_request_body(vec![Message::text("user", "hi")], false);
        assert!(body.get("system").is_none());
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn images_become_base64_source_blocks() {
        let msg = Message {
            role: "user".to_string(),
            content: "what is this".to_string(),
            images: vec![ImageAttachment::Base64 {
                media_type: "image/jpeg".to_string(),
                data: "QUJD".to_string(),
            }],
        };
        let body = client().build_request_body(vec![msg], true);
        let blocks = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "image");
        assert_eq!(blocks[0]["source"]["type"], "base64");
        assert_eq!(blocks[0]["source"]["media_type"], "image/jpeg");
        assert_eq!(blocks[1]["type"], "text");
    }

    #[test]
    fn max_tokens_is_clamped_to_provider_ceiling() {
        let c = client().with_generation(0.5, 1_000_000);
        let body = c.build_request_body(vec![Message::text("user", "hi")], false);
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["temperature"], 0.5);
    }
}
