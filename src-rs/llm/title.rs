use std::sync::Arc;

use crate::llm::models::provider_base::{Message, ProviderClient};
use crate::llm::models::provider_handle::ProviderRegistry;
use crate::llm::utils::string_util::{first_line, truncate_utf8_with_ellipsis};

const TITLE_MAX_CHARS: usize = 40;

const TITLE_INSTRUCTION: &str = "Summarize the following message as a short conversation \
title. Reply with the title only: no quotes, no trailing punctuation, at most eight words.";

/// Deterministic fallback: first line of the prompt, truncated.
pub fn placeholder_title(prompt: &str) -> String {
    let line = first_line(prompt);
    if line.is_empty() {
        return "New session".to_string();
    }
    truncate_utf8_with_ellipsis(line, TITLE_MAX_CHARS)
}

/// Asks whichever configured model comes first for a short title, using
/// the caller's own credentials. Any failure, or an empty reply, falls
/// back to the placeholder; this runs in the background and must never
/// surface an error into the send path.
pub async fn generate_title(registry: Arc<ProviderRegistry>, prompt: String) -> String {
    let fallback = placeholder_title(&prompt);
    let Some((model_key, client)) = registry.any_client() else {
        return fallback;
    };

    let messages = vec![
        Message::text("system", TITLE_INSTRUCTION),
        Message::text("user", prompt.as_str()),
    ];
    match client.chat(messages).await {
        Ok(outcome) => {
            let title = first_line(&outcome.content)
                .trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string();
            if title.is_empty() {
                fallback
            } else {
                truncate_utf8_with_ellipsis(&title, TITLE_MAX_CHARS)
            }
        }
        Err(e) => {
            log::warn!("title generation via {} failed: {}", model_key, e);
            fallback
        }
    }
}
