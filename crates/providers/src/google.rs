//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API with function calling.
//! Auth is via an API key sent in the `x-goog-api-key` header, so the key
//! never appears in a request URL or in transport errors.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use tc_domain::config::ProviderConfig;
use tc_domain::error::{Error, Result};
use tc_domain::tool::{Message, ToolCall, ToolDefinition};
use tc_domain::trace::TraceEvent;

use crate::traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
use crate::util::{from_reqwest, http_client, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for the Google Gemini API.
pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a new provider from the deserialized provider config.
    pub fn from_config(cfg: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".into());

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            client: http_client(timeout)?,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request body
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn build_body(req: &ChatRequest) -> Value {
    let contents = build_contents(&req.messages);

    let mut body = json!({ "contents": contents });

    if let Some(system) = req.system_prompt.as_deref().filter(|s| !s.is_empty()) {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }

    if !req.tools.is_empty() {
        let function_declarations: Vec<Value> = req.tools.iter().map(tool_to_gemini).collect();
        body["tools"] = json!([{ "functionDeclarations": function_declarations }]);
    }

    let mut gen_config = json!({});
    if let Some(temp) = req.temperature {
        gen_config["temperature"] = json!(temp);
    }
    if let Some(max) = req.max_tokens {
        gen_config["maxOutputTokens"] = json!(max);
    }
    if gen_config.as_object().is_some_and(|o| !o.is_empty()) {
        body["generationConfig"] = gen_config;
    }

    body
}

/// Convert the history into Gemini `contents`.
///
/// Consecutive tool results answer one model turn, so they share a single
/// `user` content with one `functionResponse` part each. Gemini rejects a
/// turn whose response count differs from its call count.
fn build_contents(messages: &[Message]) -> Vec<Value> {
    let mut contents: Vec<Value> = Vec::with_capacity(messages.len());
    let mut responses: Vec<Value> = Vec::new();

    for msg in messages {
        match msg {
            Message::Tool { content, name, .. } => responses.push(function_response(name, content)),
            other => {
                flush_responses(&mut contents, &mut responses);
                contents.push(msg_to_gemini(other));
            }
        }
    }
    flush_responses(&mut contents, &mut responses);
    contents
}

fn flush_responses(contents: &mut Vec<Value>, responses: &mut Vec<Value>) {
    if !responses.is_empty() {
        contents.push(json!({ "role": "user", "parts": std::mem::take(responses) }));
    }
}

fn msg_to_gemini(msg: &Message) -> Value {
    match msg {
        Message::User { content } => json!({
            "role": "user",
            "parts": [{ "text": content }],
        }),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut parts: Vec<Value> = Vec::new();
            if !content.is_empty() || tool_calls.is_empty() {
                parts.push(json!({ "text": content }));
            }
            for call in tool_calls {
                parts.push(json!({
                    "functionCall": {
                        "name": call.tool_name,
                        "args": call.arguments,
                    }
                }));
            }
            json!({ "role": "model", "parts": parts })
        }
        Message::Tool { content, name, .. } => json!({
            "role": "user",
            "parts": [function_response(name, content)],
        }),
    }
}

// Gemini matches results to calls by function name.
fn function_response(name: &str, content: &str) -> Value {
    json!({
        "functionResponse": {
            "name": name,
            "response": { "content": content },
        }
    })
}

fn tool_to_gemini(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn parse_gemini_response(body: &Value, model: &str) -> Result<ChatResponse> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: "google".into(),
            message: match body.pointer("/promptFeedback/blockReason").and_then(|v| v.as_str()) {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "no candidates in response".into(),
            },
        })?;

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let mut text_content = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    if let Some(parts) = parts {
        for part in parts {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                text_content.push_str(text);
            }
            if let Some(fc) = part.get("functionCall") {
                let tool_name = fc
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = fc
                    .get("args")
                    .cloned()
                    .unwrap_or(Value::Object(Default::default()));
                // Gemini has no call ids; mint one so results can be paired.
                let call_id = format!("call_{}", uuid::Uuid::new_v4());
                tool_calls.push(ToolCall {
                    call_id,
                    tool_name,
                    arguments,
                });
            }
        }
    }

    let finish_reason = candidate
        .get("finishReason")
        .and_then(|v| v.as_str())
        .map(|s| match s {
            "STOP" => "stop".to_string(),
            "MAX_TOKENS" => "length".to_string(),
            other => other.to_lowercase(),
        });

    let usage = body.get("usageMetadata").and_then(parse_gemini_usage);

    Ok(ChatResponse {
        content: text_content,
        tool_calls,
        usage,
        model: model.to_string(),
        finish_reason,
    })
}

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v
        .get("candidatesTokenCount")
        .and_then(|c| c.as_u64())
        .unwrap_or(0) as u32;
    let total = v
        .get("totalTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = self.generate_url(&model);
        let body = build_body(req);

        tracing::debug!(provider = %self.id, url = %url, "google chat request");
        let started = Instant::now();

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let response = parse_gemini_response(&resp_json, &model)?;

        TraceEvent::LlmRequest {
            provider: self.id.clone(),
            model,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: response.usage.map(|u| u.prompt_tokens),
            completion_tokens: response.usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(response)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_maps_roles_and_tools() {
        let call = ToolCall {
            call_id: "call_1".into(),
            tool_name: "wikipedia".into(),
            arguments: json!({"query": "Ada Lovelace"}),
        };
        let req = ChatRequest {
            messages: vec![
                Message::user("who was ada?"),
                Message::assistant_with_tools("", vec![call]),
                Message::tool_result("call_1", "wikipedia", "Page: Ada Lovelace"),
            ],
            tools: vec![ToolDefinition {
                name: "wikipedia".into(),
                description: "lookup".into(),
                parameters: json!({"type": "object"}),
            }],
            system_prompt: Some("Be brief.".into()),
            temperature: Some(0.2),
            ..Default::default()
        };
        let body = build_body(&req);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        // empty assistant text is omitted when a call is present
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["name"], "wikipedia");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["name"],
            "wikipedia"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "wikipedia"
        );
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn parses_text_and_function_calls() {
        let resp = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me check. "},
                    {"functionCall": {"name": "duckduckgo_search", "args": {"query": "rust 2024"}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
        });
        let parsed = parse_gemini_response(&resp, "gemini-2.0-flash").unwrap();
        assert_eq!(parsed.content, "Let me check. ");
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].query(), Some("rust 2024"));
        assert!(parsed.tool_calls[0].call_id.starts_with("call_"));
        assert_eq!(parsed.finish_reason.as_deref(), Some("stop"));
        assert_eq!(parsed.usage.map(|u| u.total_tokens), Some(17));
    }

    #[test]
    fn blocked_prompt_is_a_provider_error() {
        let resp = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = parse_gemini_response(&resp, "m").unwrap_err();
        assert!(err.to_string().contains("prompt blocked: SAFETY"));
    }

    #[test]
    fn parallel_tool_results_share_one_turn() {
        let calls = vec![
            ToolCall {
                call_id: "c1".into(),
                tool_name: "duckduckgo_search".into(),
                arguments: json!({"query": "tokio"}),
            },
            ToolCall {
                call_id: "c2".into(),
                tool_name: "wikipedia".into(),
                arguments: json!({"query": "tokio"}),
            },
        ];
        let req = ChatRequest {
            messages: vec![
                Message::user("what is tokio?"),
                Message::assistant_with_tools("", calls),
                Message::tool_result("c1", "duckduckgo_search", "An async runtime"),
                Message::tool_result("c2", "wikipedia", "Page: Tokio"),
                Message::assistant("Tokio is an async runtime."),
            ],
            ..Default::default()
        };
        let body = build_body(&req);
        let contents = body["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 4);
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["name"], "duckduckgo_search");
        assert_eq!(responses[1]["functionResponse"]["name"], "wikipedia");
        assert_eq!(contents[3]["role"], "model");
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_api_key() {
        let cfg = ProviderConfig {
            id: "google".into(),
            kind: tc_domain::config::ProviderKind::Google,
            base_url: "http://127.0.0.1:1".into(),
            auth: tc_domain::config::AuthConfig {
                key: Some("SECRETKEY123".into()),
                env: None,
            },
            default_model: None,
        };
        let provider = GoogleProvider::from_config(&cfg, Duration::from_secs(5)).unwrap();
        assert!(!provider.generate_url("gemini-2.0-flash").contains("SECRETKEY123"));

        let req = ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let err = provider.chat(&req).await.unwrap_err().to_string();
        assert!(!err.contains("SECRETKEY123"), "key leaked: {err}");
    }
}
