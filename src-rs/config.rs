use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cons::provider_cons::LLMProvider;
use crate::errors::CoreError;

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g., "deepseek", "claude-gateway")
    pub name: String,

    #[serde(default)]
    pub brand: Option<String>,

    /// Base URL for the provider API
    pub base_url: String,

    /// API key for authentication
    #[serde(default)]
    pub api_key: String,

    /// List of supported models
    #[serde(default)]
    pub models: Vec<String>,
}

/// Generation parameters applied to every outgoing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    4096
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub selected_models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub total_cost: f64,
}

/// User override configuration (restricted fields)
#[derive(Deserialize)]
pub struct UserOverrideConfig {
    pub providers: Option<Vec<UserProviderConfig>>,
    pub request: Option<RequestConfig>,
}

/// User provider configuration (matching user schema). Merged into the
/// embedded provider list by name; only the fields present override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProviderConfig {
    #[serde(rename = "provider_id", alias = "provider_name")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub models: Option<Vec<String>>,
}

/// Global application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Runtime configuration (Internal use)
    #[serde(skip)]
    pub runtime: RuntimeConfig,

    /// List of providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Generation parameters
    #[serde(default)]
    pub request: RequestConfig,
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chorus"))
}

fn user_patch_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("chorus.json"))
}

fn runtime_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("chorus-runtime.json"))
}

impl AppConfig {
    /// Load configuration with layered strategy:
    /// 1. Defaults (Embedded Config.toml)
    /// 2. User Config (~/.chorus/chorus.json) - providers / request only
    /// 3. Runtime Config (~/.chorus/chorus-runtime.json) - runtime state
    pub fn load() -> Result<Self> {
        let default_str = include_str!("../Config.toml");
        let mut config: AppConfig =
            toml::from_str(default_str).context("Failed to parse embedded Config.toml")?;

        if let Some(user_path) = user_patch_path() {
            Self::apply_patch(&mut config, user_path);
        }

        if let Some(runtime_path) = runtime_path() {
            if runtime_path.exists() {
                if let Ok(content) = fs::read_to_string(&runtime_path) {
                    match serde_json::from_str::<RuntimeConfig>(&content) {
                        Ok(runtime_config) => config.runtime = runtime_config,
                        Err(e) => {
                            log::warn!(
                                "Failed to parse runtime config at {}: {}",
                                runtime_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        // Selections pointing at models no provider lists anymore are
        // dropped rather than carried as permanently-broken keys.
        let known: Vec<String> = config.model_keys();
        config
            .runtime
            .selected_models
            .retain(|key| known.contains(key));

        Ok(config)
    }

    pub fn save_runtime(&self) -> Result<()> {
        if let Some(dir) = config_dir() {
            if !dir.exists() {
                fs::create_dir_all(&dir)?;
            }
            let path = dir.join("chorus-runtime.json");
            let content = serde_json::to_string_pretty(&self.runtime)?;
            fs::write(path, content)?;
        }
        Ok(())
    }

    pub(crate) fn apply_patch<P: AsRef<Path>>(config: &mut AppConfig, path: P) {
        let path = path.as_ref();
        if !path.exists() {
            return;
        }
        let Ok(content) = fs::read_to_string(path) else {
            return;
        };
        match serde_json::from_str::<UserOverrideConfig>(&content) {
            Ok(patch) => {
                if let Some(user_providers) = patch.providers {
                    let mut by_name: HashMap<String, UserProviderConfig> = HashMap::new();
                    for p in user_providers {
                        let name = LLMProvider::from_name(&p.provider_id)
                            .map(|known| known.provider_name().to_string())
                            .unwrap_or_else(|| p.provider_id.clone());
                        by_name.insert(name, p);
                    }
                    for provider in &mut config.providers {
                        if let Some(patch) = by_name.remove(&provider.name) {
                            if let Some(api_key) = patch.api_key {
                                provider.api_key = api_key;
                            }
                            if let Some(base_url) = patch.base_url {
                                provider.base_url = base_url;
                            }
                            if let Some(models) = patch.models {
                                if !models.is_empty() {
                                    provider.models = models;
                                }
                            }
                        }
                    }
                }
                if let Some(request) = patch.request {
                    config.request = request;
                }
            }
            Err(e) => {
                log::warn!("Failed to parse config patch at {}: {}", path.display(), e);
            }
        }
    }

    /// Persists the per-provider overrides (credentials included) back
    /// to the user patch file.
    pub fn save_user_patch(&self) -> Result<()> {
        let Some(dir) = config_dir() else {
            return Ok(());
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let providers: Vec<UserProviderConfig> = self
            .providers
            .iter()
            .filter(|p| !p.api_key.trim().is_empty())
            .map(|p| UserProviderConfig {
                provider_id: p.name.clone(),
                api_key: Some(p.api_key.clone()),
                base_url: Some(p.base_url.clone()),
                models: Some(p.models.clone()),
            })
            .collect();

        let patch = serde_json::json!({
            "providers": providers,
            "request": self.request,
        });
        let content = serde_json::to_string_pretty(&patch)?;
        fs::write(dir.join("chorus.json"), content)?;
        Ok(())
    }

    pub fn provider(&self, provider: LLMProvider) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.name == provider.provider_name())
    }

    /// Stores a validated credential for one provider.
    pub fn set_api_key(&mut self, provider: LLMProvider, api_key: &str) -> Result<(), CoreError> {
        provider.validate_api_key(api_key)?;
        let entry = self
            .providers
            .iter_mut()
            .find(|p| p.name == provider.provider_name())
            .ok_or_else(|| {
                CoreError::Configuration(format!("provider not in config: {}", provider))
            })?;
        entry.api_key = api_key.trim().to_string();
        Ok(())
    }

    pub fn clear_api_key(&mut self, provider: LLMProvider) {
        if let Some(entry) = self
            .providers
            .iter_mut()
            .find(|p| p.name == provider.provider_name())
        {
            entry.api_key = String::new();
        }
    }

    /// Every `"provider:model"` key the configuration knows about,
    /// configured or not.
    pub fn model_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for provider in &self.providers {
            for model in &provider.models {
                keys.push(format!("{}:{}", provider.name, model));
            }
        }
        keys
    }

    /// Accumulates settled usage into the runtime totals.
    pub fn add_usage(&mut self, tokens: u64, cost: f64) {
        self.runtime.total_tokens = self.runtime.total_tokens.saturating_add(tokens);
        self.runtime.total_cost += cost;
    }

    pub fn to_public(&self) -> PublicAppConfig {
        PublicAppConfig {
            runtime: self.runtime.clone(),
            providers: self
                .providers
                .iter()
                .map(|p| PublicProviderConfig {
                    name: p.name.clone(),
                    brand: p.brand.clone(),
                    base_url: p.base_url.clone(),
                    models: p.models.clone(),
                    configured: !p.api_key.trim().is_empty(),
                })
                .collect(),
            request: self.request.clone(),
        }
    }
}

/// Credential-free view of the configuration, safe to hand to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct PublicAppConfig {
    pub runtime: RuntimeConfig,
    pub providers: Vec<PublicProviderConfig>,
    pub request: RequestConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicProviderConfig {
    pub name: String,
    pub brand: Option<String>,
    pub base_url: String,
    pub models: Vec<String>,
    pub configured: bool,
}
