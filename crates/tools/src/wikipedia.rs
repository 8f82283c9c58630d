//! `wikipedia`: encyclopedia lookup through the MediaWiki action API.
//!
//! One request runs a full-text search as a generator and returns the
//! plain-text intro of each hit. Output is one `Page:`/`Summary:` block per
//! page, blank-line separated, truncated to `max_chars`.

use serde::Deserialize;

use tc_domain::config::WikipediaConfig;
use tc_domain::error::{Error, Result};
use tc_domain::tool::ToolDefinition;

use crate::{query_schema, truncate_chars, Tool};

pub const NAME: &str = "wikipedia";
pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Queries longer than this are cut before searching.
const MAX_QUERY_CHARS: usize = 300;

pub struct WikipediaLookup {
    client: reqwest::Client,
    api_url: String,
    top_k_results: usize,
    max_chars: usize,
}

impl WikipediaLookup {
    pub fn new(client: reqwest::Client, config: &WikipediaConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            top_k_results: config.top_k_results.max(1),
            max_chars: config.max_chars,
        }
    }

    fn err(message: impl Into<String>) -> Error {
        Error::Tool {
            tool: NAME.into(),
            message: message.into(),
        }
    }
}

// ── MediaWiki response shapes ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    title: String,
    /// Search rank from the generator; pages arrive unordered.
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: Option<String>,
}

#[async_trait::async_trait]
impl Tool for WikipediaLookup {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: NAME.into(),
            description: "A wrapper around Wikipedia. Useful for when you need to answer \
                          general questions about people, places, companies, facts, historical \
                          events, or other subjects. Input should be a search query."
                .into(),
            parameters: query_schema("search query to look up"),
        }
    }

    async fn call(&self, query: &str) -> Result<String> {
        let query = truncate_chars(query.trim(), MAX_QUERY_CHARS);
        if query.is_empty() {
            return Err(Self::err("query must not be empty"));
        }

        let limit = self.top_k_results.to_string();
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", query.as_str()),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|e| Self::err(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Self::err(format!("wikipedia returned HTTP {status}")));
        }
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| Self::err(format!("decoding response: {e}")))?;

        let text = render_pages(body, self.top_k_results, self.max_chars);
        tracing::debug!(query = %query, chars = text.len(), "wikipedia lookup");
        Ok(text)
    }
}

/// Render the top `top_k` pages, or the no-result sentinel.
pub fn render_pages(body: ApiResponse, top_k: usize, max_chars: usize) -> String {
    let mut pages = body.query.map(|q| q.pages).unwrap_or_default();
    pages.sort_by_key(|p| p.index);

    let blocks: Vec<String> = pages
        .into_iter()
        .filter_map(|p| {
            let extract = p.extract?.trim().to_owned();
            (!extract.is_empty()).then(|| format!("Page: {}\nSummary: {}", p.title, extract))
        })
        .take(top_k)
        .collect();

    if blocks.is_empty() {
        return NO_RESULT.to_owned();
    }
    truncate_chars(&blocks.join("\n\n"), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pages_render_in_search_order() {
        let body = parse(
            r#"{"batchcomplete":true,"query":{"pages":[
                {"pageid":2,"title":"Rust (fungus)","index":2,"extract":"A plant disease."},
                {"pageid":1,"title":"Rust (programming language)","index":1,"extract":"A systems language."}
            ]}}"#,
        );
        assert_eq!(
            render_pages(body, 3, 4000),
            "Page: Rust (programming language)\nSummary: A systems language.\n\n\
             Page: Rust (fungus)\nSummary: A plant disease."
        );
    }

    #[test]
    fn top_k_and_truncation_apply() {
        let body = parse(
            r#"{"query":{"pages":[
                {"title":"A","index":1,"extract":"aaaa"},
                {"title":"B","index":2,"extract":"bbbb"}
            ]}}"#,
        );
        let text = render_pages(body, 1, 10);
        assert_eq!(text, "Page: A\nSu");
    }

    #[test]
    fn empty_or_missing_query_is_no_result() {
        assert_eq!(render_pages(parse(r#"{"batchcomplete":true}"#), 3, 4000), NO_RESULT);
        assert_eq!(
            render_pages(parse(r#"{"query":{"pages":[{"title":"X","index":1,"extract":"  "}]}}"#), 3, 4000),
            NO_RESULT
        );
    }
}
