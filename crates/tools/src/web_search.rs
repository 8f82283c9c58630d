//! `duckduckgo_search`: web search through DuckDuckGo's HTML endpoint.
//!
//! The endpoint returns a plain results page; snippets are pulled out of the
//! `result__snippet` anchors, stripped of markup and joined into one block.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::header::ACCEPT;

use tc_domain::config::WebSearchConfig;
use tc_domain::error::{Error, Result};
use tc_domain::tool::ToolDefinition;

use crate::{query_schema, Tool};

pub const NAME: &str = "duckduckgo_search";
pub const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(client: reqwest::Client, config: &WebSearchConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            max_results: config.max_results,
        }
    }

    fn err(message: impl Into<String>) -> Error {
        Error::Tool {
            tool: NAME.into(),
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for DuckDuckGoSearch {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.into(),
            description: "A wrapper around DuckDuckGo Search. Useful for when you need to \
                          answer questions about current events. Input should be a search query."
                .into(),
            parameters: query_schema("search query to look up"),
        }
    }

    async fn call(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Self::err("query must not be empty"));
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .header(ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| Self::err(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Self::err(format!("search returned HTTP {status}")));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| Self::err(format!("reading response: {e}")))?;

        let snippets = extract_snippets(&html, self.max_results);
        tracing::debug!(query, results = snippets.len(), "duckduckgo search");
        if snippets.is_empty() {
            return Ok(NO_RESULT.to_owned());
        }
        Ok(snippets.join(" "))
    }
}

/// Pull up to `max` result snippets out of a DuckDuckGo HTML results page.
pub fn extract_snippets(html: &str, max: usize) -> Vec<String> {
    static SNIPPET: OnceLock<Regex> = OnceLock::new();
    let re = SNIPPET.get_or_init(|| {
        Regex::new(r#"(?s)<(?:a|td|div)[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|td|div)>"#)
            .expect("snippet pattern is a valid regex")
    });

    re.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| strip_markup(m.as_str()))
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}

/// Remove tags, decode common entities and collapse whitespace.
pub fn strip_markup(fragment: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| {
        Regex::new(r"<[^>]+>").expect("tag pattern is a valid regex")
    });

    let text = tag.replace_all(fragment, "");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="result results_links">
          <a class="result__a" href="https://www.rust-lang.org/">Rust</a>
          <a class="result__snippet" href="https://www.rust-lang.org/">A language empowering
             everyone to build <b>reliable</b> &amp; efficient software.</a>
        </div>
        <div class="result results_links">
          <a class="result__snippet" href="https://doc.rust-lang.org/book/">The Rust
             Programming Language &quot;book&quot;</a>
        </div>
        <div class="result results_links">
          <a class="result__snippet" href="x">third</a>
        </div>
    "#;

    #[test]
    fn extracts_and_cleans_snippets() {
        let snippets = extract_snippets(PAGE, 5);
        assert_eq!(snippets.len(), 3);
        assert_eq!(
            snippets[0],
            "A language empowering everyone to build reliable & efficient software."
        );
        assert_eq!(snippets[1], "The Rust Programming Language \"book\"");
    }

    #[test]
    fn respects_max_results() {
        assert_eq!(extract_snippets(PAGE, 2).len(), 2);
    }

    #[test]
    fn no_results_page_yields_nothing() {
        let html = r#"<div class="no-results">No results.</div>"#;
        assert!(extract_snippets(html, 5).is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_network() {
        let tool = DuckDuckGoSearch::new(reqwest::Client::new(), &WebSearchConfig::default());
        let err = tool.call("   ").await.unwrap_err();
        assert!(err.to_string().contains("query must not be empty"));
    }
}
