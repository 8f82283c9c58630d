//! The turn loop.
//!
//! `AWAITING_GENERATION -> (tool calls?) -> AWAITING_TOOL_RESULT ->
//! AWAITING_GENERATION -> ... -> DONE`, bounded by `max_tool_loops`
//! generation calls. Every appended message is checkpointed before the
//! next step runs.

use std::time::Instant;

use tc_domain::error::Error;
use tc_domain::tool::Message;
use tc_domain::trace::TraceEvent;
use tc_providers::ChatRequest;
use tc_threads::{Checkpoint, CheckpointSource};

use super::{final_text, tools, ConversationEngine, TurnError};

impl ConversationEngine {
    /// Run one user-message-in, assistant-message-out cycle on `thread_id`.
    ///
    /// Holds the thread's lock from the first load to the final checkpoint,
    /// so concurrent turns on one thread apply in arrival order.
    pub async fn turn(&self, thread_id: &str, user_text: &str) -> Result<String, TurnError> {
        if thread_id.is_empty() {
            return Err(TurnError::InvalidThread);
        }
        let started = Instant::now();

        let _permit = self
            .locks
            .acquire(thread_id)
            .await
            .map_err(|_| TurnError::Lock)?;

        let mut head = self.store.latest(thread_id).await?;
        let mut messages = head.as_ref().map(|c| c.messages.clone()).unwrap_or_default();

        messages.push(Message::user(user_text));
        self.checkpoint(thread_id, &mut head, &messages, CheckpointSource::Input)
            .await?;

        let provider = self.provider.as_ref().ok_or_else(|| {
            TurnError::Generation(Error::Config("no LLM provider configured".into()))
        })?;
        let tool_defs = self.tools.definitions();

        let mut generations = 0usize;
        loop {
            if generations >= self.settings.max_tool_loops {
                tracing::warn!(thread_id, generations, "tool loop limit reached");
                return Err(TurnError::ToolLoopExceeded(generations));
            }
            generations += 1;
            tracing::debug!(thread_id, generation = generations, "calling model");

            let req = ChatRequest {
                messages: messages.clone(),
                tools: tool_defs.clone(),
                system_prompt: self.settings.system_prompt.clone(),
                temperature: self.settings.temperature,
                ..Default::default()
            };
            let reply = provider
                .chat(&req)
                .await
                .map_err(TurnError::Generation)?
                .into_message();
            let calls = reply.pending_tool_calls().to_vec();

            messages.push(reply);
            self.checkpoint(thread_id, &mut head, &messages, CheckpointSource::Loop)
                .await?;

            if calls.is_empty() {
                break;
            }

            for call in &calls {
                let result = tools::dispatch(&self.tools, call).await;
                messages.push(result);
                self.checkpoint(thread_id, &mut head, &messages, CheckpointSource::Loop)
                    .await?;
            }
        }

        TraceEvent::TurnCompleted {
            thread_id: thread_id.to_owned(),
            generations,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(final_text(&messages))
    }

    /// Write the next checkpoint in the chain and make it the new head.
    async fn checkpoint(
        &self,
        thread_id: &str,
        head: &mut Option<Checkpoint>,
        messages: &[Message],
        source: CheckpointSource,
    ) -> Result<(), TurnError> {
        let next = Checkpoint::next(thread_id, head.as_ref(), messages.to_vec(), source);
        self.store.put(next.clone()).await?;
        *head = Some(next);
        Ok(())
    }
}
