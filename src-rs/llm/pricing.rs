use crate::cons::provider_cons::LLMProvider;

/// Blended per-1K-token rate in USD. Input/output are not split; the
/// figures are indicative, for the usage counters in the UI, not for
/// billing.
fn rate_per_1k(provider: LLMProvider, model: &str) -> f64 {
    match provider {
        LLMProvider::DeepSeek => match model {
            "deepseek-reasoner" => 0.008,
            _ => 0.002,
        },
        LLMProvider::Aliyun => match model {
            "qwen-turbo" => 0.0008,
            _ => 0.004,
        },
        LLMProvider::Volcengine => 0.009,
        LLMProvider::Moonshot => match model {
            m if m.starts_with("kimi") => 0.008,
            _ => 0.012,
        },
        LLMProvider::ClaudeGateway => 0.021,
    }
}

/// Estimated cost of a settled call. Unknown models fall back to the
/// provider's default rate; this never fails.
pub fn calculate_cost(provider: LLMProvider, model: &str, tokens: u32) -> f64 {
    tokens as f64 / 1000.0 * rate_per_1k(provider, model)
}
