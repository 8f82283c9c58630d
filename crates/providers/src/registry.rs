//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication (env vars, direct
//! keys), and instantiates the appropriate adapter for each configured provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tc_domain::config::{LlmConfig, ProviderConfig, ProviderKind};
use tc_domain::error::{Error, Result};

use crate::google::GoogleProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// Config order, so "first configured" is stable.
    order: Vec<String>,
    default_id: Option<String>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Providers that fail to initialize (usually a missing API key) are
    /// logged and skipped rather than aborting startup. The server still
    /// answers thread listing, history and deletion without a model.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut order = Vec::new();

        for pc in &config.providers {
            match build_provider(pc, timeout) {
                Ok(provider) => {
                    tracing::info!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        "registered LLM provider"
                    );
                    order.push(pc.id.clone());
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if providers.is_empty() && !config.providers.is_empty() {
            let require = std::env::var("TC_REQUIRE_LLM")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);
            if require {
                return Err(Error::Config(
                    "all configured LLM providers failed to initialize".into(),
                ));
            }
            tracing::warn!(
                "no LLM providers initialized; /chat will fail until auth is configured"
            );
        }

        let default_id = match &config.default_provider {
            Some(id) if providers.contains_key(id) => Some(id.clone()),
            Some(id) => {
                tracing::warn!(provider_id = %id, "default_provider not available, falling back to first registered");
                order.first().cloned()
            }
            None => order.first().cloned(),
        };

        Ok(Self {
            providers,
            order,
            default_id,
        })
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// The provider used for conversation turns.
    pub fn default_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered provider ids in config order.
    pub fn list_providers(&self) -> Vec<String> {
        self.order.clone()
    }
}

fn build_provider(pc: &ProviderConfig, timeout: Duration) -> Result<Arc<dyn LlmProvider>> {
    Ok(match pc.kind {
        ProviderKind::Google => Arc::new(GoogleProvider::from_config(pc, timeout)?),
        ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatProvider::from_config(pc, timeout)?),
    })
}
