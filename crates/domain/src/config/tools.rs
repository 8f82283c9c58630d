use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tools (web search / encyclopedia)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration for the lookup tools the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Hard timeout for one tool HTTP request (seconds).
    #[serde(default = "d_20")]
    pub timeout_secs: u64,
    /// User-Agent sent with every tool request.
    #[serde(default = "d_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            user_agent: d_user_agent(),
            web_search: WebSearchConfig::default(),
            wikipedia: WikipediaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// DuckDuckGo HTML endpoint.
    #[serde(default = "d_ddg_url")]
    pub base_url: String,
    /// Maximum number of result snippets joined into the tool output.
    #[serde(default = "d_5")]
    pub max_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: d_ddg_url(),
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// MediaWiki action API endpoint.
    #[serde(default = "d_wiki_url")]
    pub api_url: String,
    /// Number of pages summarized per query.
    #[serde(default = "d_3")]
    pub top_k_results: usize,
    /// Maximum characters of tool output.
    #[serde(default = "d_4000")]
    pub max_chars: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: d_wiki_url(),
            top_k_results: 3,
            max_chars: 4000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_20() -> u64 {
    20
}
fn d_3() -> usize {
    3
}
fn d_5() -> usize {
    5
}
fn d_4000() -> usize {
    4000
}
fn d_true() -> bool {
    true
}
fn d_user_agent() -> String {
    concat!("threadchat/", env!("CARGO_PKG_VERSION")).into()
}
fn d_ddg_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn d_wiki_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}
