//! HTTP client for the ThreadChat API, used by the terminal REPL.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::json;

use tc_domain::config::ClientConfig;

use crate::api::archive::SaveChatResponse;
use crate::api::chat::ChatResponse;
use crate::api::threads::{HistoryMessage, HistoryResponse, NewThreadResponse, ThreadListResponse};

pub struct ApiClient {
    base: String,
    http: reqwest::Client,
    chat_timeout: Duration,
}

impl ApiClient {
    pub fn new(base: &str, config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("threadchat-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_owned(),
            http,
            chat_timeout: Duration::from_secs(config.chat_timeout_secs),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn new_thread(&self) -> anyhow::Result<String> {
        let resp: NewThreadResponse = send(self.http.post(self.url("/new_thread"))).await?;
        Ok(resp.thread_id)
    }

    pub async fn threads(&self) -> anyhow::Result<Vec<String>> {
        let resp: ThreadListResponse = send(self.http.get(self.url("/threads"))).await?;
        Ok(resp.threads)
    }

    pub async fn chat(&self, thread_id: &str, message: &str) -> anyhow::Result<String> {
        let req = self
            .http
            .post(self.url("/chat"))
            .timeout(self.chat_timeout)
            .json(&json!({ "thread_id": thread_id, "message": message }));
        let resp: ChatResponse = send(req).await?;
        Ok(resp.response)
    }

    pub async fn history(&self, thread_id: &str) -> anyhow::Result<Vec<HistoryMessage>> {
        let resp: HistoryResponse =
            send(self.http.get(self.url(&format!("/history/{thread_id}")))).await?;
        Ok(resp.history)
    }

    pub async fn save_chat(&self, thread_id: &str, name: &str) -> anyhow::Result<SaveChatResponse> {
        let req = self
            .http
            .post(self.url("/save_chat"))
            .json(&json!({ "thread_id": thread_id, "chat_name": name }));
        send(req).await
    }

    /// Returns the server's confirmation message.
    pub async fn delete_chat(&self, thread_id: &str) -> anyhow::Result<String> {
        let req = self
            .http
            .delete(self.url("/delete_chat"))
            .json(&json!({ "thread_id": thread_id }));
        let body: serde_json::Value = send(req).await?;
        Ok(body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("deleted")
            .to_owned())
    }
}

/// Send a request and decode the JSON body. Non-2xx responses surface the
/// server's `detail` text.
async fn send<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> anyhow::Result<T> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
            .unwrap_or(text);
        anyhow::bail!("HTTP {}: {detail}", status.as_u16());
    }
    Ok(resp.json().await?)
}
