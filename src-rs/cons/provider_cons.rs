use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    DeepSeek,
    Aliyun,
    Volcengine,
    Moonshot,
    ClaudeGateway,
}

impl LLMProvider {
    /// Returns the unique identifier used in configuration and model keys
    /// (e.g., "deepseek", "claude-gateway")
    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::DeepSeek => "deepseek",
            LLMProvider::Aliyun => "aliyun",
            LLMProvider::Volcengine => "volcengine",
            LLMProvider::Moonshot => "moonshot",
            LLMProvider::ClaudeGateway => "claude-gateway",
        }
    }

    /// Helper to parse from a string (handles aliases)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deepseek" => Some(LLMProvider::DeepSeek),
            "aliyun" | "dashscope" | "qwen" => Some(LLMProvider::Aliyun),
            "volcengine" | "ark" | "doubao" => Some(LLMProvider::Volcengine),
            "moonshot" | "kimi" => Some(LLMProvider::Moonshot),
            "claude-gateway" | "claude" | "anthropic" => Some(LLMProvider::ClaudeGateway),
            _ => None,
        }
    }

    /// Documented ceiling for `max_tokens`; request values are clamped
    /// here before they reach the wire.
    pub fn max_output_tokens(&self) -> u32 {
        match self {
            LLMProvider::DeepSeek => 8192,
            LLMProvider::Aliyun => 8192,
            LLMProvider::Volcengine => 12288,
            LLMProvider::Moonshot => 8192,
            LLMProvider::ClaudeGateway => 8192,
        }
    }

    pub fn supports_vision(&self) -> bool {
        matches!(self, LLMProvider::Volcengine | LLMProvider::ClaudeGateway)
    }

    /// Client-side credential format check: prefix and minimum length
    /// per vendor. Runs before a key is accepted into configuration.
    pub fn validate_api_key(&self, key: &str) -> Result<(), CoreError> {
        let key = key.trim();
        let (prefix, min_len) = match self {
            LLMProvider::DeepSeek => ("sk-", 20),
            LLMProvider::Aliyun => ("sk-", 20),
            LLMProvider::Volcengine => ("", 32),
            LLMProvider::Moonshot => ("sk-", 20),
            LLMProvider::ClaudeGateway => ("sk-", 24),
        };
        if !key.starts_with(prefix) || key.len() < min_len {
            return Err(CoreError::Configuration(format!(
                "invalid api key format for provider {}",
                self.provider_name()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.provider_name())
    }
}

/// Splits a `"provider:model"` key into its provider tag and model name.
pub fn split_model_key(key: &str) -> Result<(LLMProvider, &str), CoreError> {
    let (provider_part, model) = key.split_once(':').ok_or_else(|| {
        CoreError::Configuration(format!(
            "invalid model key (expected provider:model): {}",
            key
        ))
    })?;
    let provider = LLMProvider::from_name(provider_part)
        .ok_or_else(|| CoreError::Configuration(format!("unknown provider: {}", provider_part)))?;
    Ok((provider, model))
}
