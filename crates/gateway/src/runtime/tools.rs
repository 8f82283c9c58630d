//! Tool dispatch for the turn loop.
//!
//! Failures never abort the turn: they become a tool message starting with
//! `Error:` so the model can see what went wrong and answer anyway.

use std::time::Instant;

use tc_domain::error::Error;
use tc_domain::tool::{Message, ToolCall};
use tc_domain::trace::TraceEvent;
use tc_tools::ToolRegistry;

/// Run one requested tool call and wrap the outcome as a tool message
/// answering `call`.
pub async fn dispatch(tools: &ToolRegistry, call: &ToolCall) -> Message {
    let started = Instant::now();

    let outcome = match call.query() {
        Some(query) => tools.call(&call.tool_name, query).await,
        None => Err(Error::Tool {
            tool: call.tool_name.clone(),
            message: "missing string argument 'query'".into(),
        }),
    };

    let (content, is_error) = match outcome {
        Ok(text) => (text, false),
        Err(e) => {
            tracing::warn!(tool = %call.tool_name, error = %e, "tool call failed");
            (format!("Error: {e}"), true)
        }
    };

    TraceEvent::ToolInvoked {
        tool_name: call.tool_name.clone(),
        duration_ms: started.elapsed().as_millis() as u64,
        is_error,
    }
    .emit();

    Message::tool_result(&call.call_id, &call.tool_name, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    struct Upper;

    #[async_trait::async_trait]
    impl tc_tools::Tool for Upper {
        fn definition(&self) -> tc_domain::tool::ToolDefinition {
            tc_domain::tool::ToolDefinition {
                name: "upper".into(),
                description: "uppercases".into(),
                parameters: tc_tools::query_schema("text"),
            }
        }
        async fn call(&self, query: &str) -> tc_domain::error::Result<String> {
            Ok(query.to_uppercase())
        }
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            call_id: "call_1".into(),
            tool_name: name.into(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn success_answers_the_call() {
        let tools = ToolRegistry::new().register(Arc::new(Upper));
        let msg = dispatch(&tools, &call("upper", json!({"query": "abc"}))).await;
        assert_eq!(msg, Message::tool_result("call_1", "upper", "ABC"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_text() {
        let tools = ToolRegistry::new();
        let msg = dispatch(&tools, &call("nope", json!({"query": "x"}))).await;
        assert!(msg.content().starts_with("Error:"));
        assert!(msg.content().contains("unknown tool: nope"));
    }

    #[tokio::test]
    async fn missing_query_becomes_error_text() {
        let tools = ToolRegistry::new().register(Arc::new(Upper));
        let msg = dispatch(&tools, &call("upper", json!({"q": 1}))).await;
        assert!(msg.content().starts_with("Error:"));
    }
}
