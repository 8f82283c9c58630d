use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider used for conversation turns. When `None`, the first
    /// configured provider is used.
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Sampling temperature passed on every generation call.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Upper bound on generation calls within a single turn.  A turn whose
    /// model keeps requesting tools past this bound fails instead of
    /// looping forever.
    #[serde(default = "d_25")]
    pub max_tool_loops: usize,
    /// Optional system instruction sent with every generation call.
    /// Never persisted into a thread's history.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// HTTP timeout for a single generation call.
    #[serde(default = "d_120000")]
    pub timeout_ms: u64,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default = "d_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            temperature: None,
            max_tool_loops: 25,
            system_prompt: None,
            timeout_ms: 120_000,
            providers: d_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    OpenaiCompat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer `env`).
    #[serde(default)]
    pub key: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_25() -> usize {
    25
}
fn d_120000() -> u64 {
    120_000
}
fn d_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        id: "google".into(),
        kind: ProviderKind::Google,
        base_url: "https://generativelanguage.googleapis.com".into(),
        auth: AuthConfig {
            env: Some("GOOGLE_API_KEY".into()),
            key: None,
        },
        default_model: Some("gemini-2.0-flash".into()),
    }]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_is_gemini_from_env() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.providers.len(), 1);
        let p = &cfg.providers[0];
        assert_eq!(p.kind, ProviderKind::Google);
        assert_eq!(p.auth.env.as_deref(), Some("GOOGLE_API_KEY"));
        assert_eq!(p.default_model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn explicit_providers_replace_default() {
        let toml_str = r#"
            max_tool_loops = 4

            [[providers]]
            id = "local"
            kind = "openai_compat"
            base_url = "http://localhost:11434/v1"
            default_model = "llama3.1"
        "#;
        let cfg: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.max_tool_loops, 4);
        assert_eq!(cfg.providers.len(), 1);
        assert_eq!(cfg.providers[0].kind, ProviderKind::OpenaiCompat);
        assert!(cfg.providers[0].auth.env.is_none());
    }
}
