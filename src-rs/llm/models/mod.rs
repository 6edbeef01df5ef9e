pub mod claude_gateway;
pub mod openai_compat;
pub mod provider_base;
pub mod provider_handle;
#[cfg(test)]
pub mod scripted;
