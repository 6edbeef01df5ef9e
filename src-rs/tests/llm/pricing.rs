use crate::cons::provider_cons::LLMProvider;
use crate::llm::pricing::calculate_cost;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_linear_in_tokens() {
        let one = calculate_cost(LLMProvider::DeepSeek, "deepseek-chat", 1000);
        let two = calculate_cost(LLMProvider::DeepSeek, "deepseek-chat", 2000);
        assert!((two - one * 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(calculate_cost(LLMProvider::ClaudeGateway, "claude-sonnet-4-20250514", 0), 0.0);
    }

    #[test]
    fn reasoner_costs_more_than_chat() {
        let chat = calculate_cost(LLMProvider::DeepSeek, "deepseek-chat", 1000);
        let reasoner = calculate_cost(LLMProvider::DeepSeek, "deepseek-reasoner", 1000);
        assert!(reasoner > chat);
    }

    #[test]
    fn unknown_model_falls_back_to_provider_default() {
        let known = calculate_cost(LLMProvider::Aliyun, "qwen-plus", 1000);
        let unknown = calculate_cost(LLMProvider::Aliyun, "qwen-max-preview", 1000);
        assert_eq!(known, unknown);
    }

    #[test]
    fn kimi_models_use_the_kimi_rate() {
        let kimi = calculate_cost(LLMProvider::Moonshot, "kimi-latest", 1000);
        let v1 = calculate_cost(LLMProvider::Moonshot, "moonshot-v1-8k", 1000);
        assert!(kimi < v1);
    }
}
