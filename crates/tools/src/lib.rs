//! Lookup tools the model may call during a turn.
//!
//! Every tool takes a single `query` string and returns plain text. The
//! registry hands the engine the tool definitions to advertise and
//! dispatches calls by name.

pub mod web_search;
pub mod wikipedia;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tc_domain::config::ToolsConfig;
use tc_domain::error::{Error, Result};
use tc_domain::tool::ToolDefinition;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn call(&self, query: &str) -> Result<String>;
}

/// JSON Schema shared by every built-in tool: one required `query` string.
pub fn query_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["query"],
        "properties": {
            "query": { "type": "string", "description": description }
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Registry of callable tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Returns self for chaining.
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
        self
    }

    /// Definitions of every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut v: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        v
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Call a tool by name.
    pub async fn call(&self, name: &str, query: &str) -> Result<String> {
        let tool = self.tools.get(name).ok_or_else(|| Error::Tool {
            tool: name.to_owned(),
            message: format!("unknown tool: {name}"),
        })?;
        tool.call(query).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Build the registry with every built-in tool enabled in `config`.
pub fn build_default_registry(config: &ToolsConfig) -> Result<ToolRegistry> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Error::Http(format!("building tool http client: {e}")))?;

    let mut registry = ToolRegistry::new();
    if config.web_search.enabled {
        registry = registry.register(Arc::new(web_search::DuckDuckGoSearch::new(
            client.clone(),
            &config.web_search,
        )));
    }
    if config.wikipedia.enabled {
        registry = registry.register(Arc::new(wikipedia::WikipediaLookup::new(
            client,
            &config.wikipedia,
        )));
    }

    tracing::debug!(tools = registry.len(), "tool registry built");
    Ok(registry)
}

/// Truncate to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "Echo the query".into(),
                parameters: query_schema("text to echo"),
            }
        }
        async fn call(&self, query: &str) -> Result<String> {
            Ok(query.to_owned())
        }
    }

    #[test]
    fn default_registry_has_both_tools() {
        let registry = build_default_registry(&ToolsConfig::default()).unwrap();
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["duckduckgo_search", "wikipedia"]);
    }

    #[test]
    fn disabled_tools_are_skipped() {
        let mut cfg = ToolsConfig::default();
        cfg.wikipedia.enabled = false;
        let registry = build_default_registry(&cfg).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("wikipedia").is_none());
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let registry = ToolRegistry::new().register(Arc::new(Echo));
        assert_eq!(registry.call("echo", "ping").await.unwrap(), "ping");
        let err = registry.call("nope", "x").await.unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
