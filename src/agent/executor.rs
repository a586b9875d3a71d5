//! Agent executor - iterative tool-calling loop
//!
//! Sends the conversation to the model, runs the requested tools against a
//! working copy of the state and repeats until the model answers without
//! calling a tool.

use super::registry::ToolRegistry;
use super::state::{AgentState, StateUpdate};
use crate::llm::{LlmClient, Message, ToolCall};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const TOOL_ARGS_LOG_LIMIT: usize = 200;

/// Runs the model and its tools to completion
pub struct AgentExecutor {
    llm: Arc<LlmClient>,
    registry: ToolRegistry,
    system_prompt: String,
    max_iterations: usize,
}

impl AgentExecutor {
    /// Create an executor
    #[must_use]
    pub const fn new(
        llm: Arc<LlmClient>,
        registry: ToolRegistry,
        system_prompt: String,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            registry,
            system_prompt,
            max_iterations,
        }
    }

    /// Run the loop starting from `state`.
    ///
    /// The returned update holds the messages produced during the run and the
    /// files mapping when a tool changed it.
    ///
    /// # Errors
    ///
    /// Returns an error when the model call fails or the iteration limit is
    /// reached before a final answer.
    #[instrument(skip_all, fields(files = state.files.len()))]
    pub async fn run(&self, state: &AgentState) -> Result<StateUpdate> {
        let mut working = state.clone();
        let history_len = working.messages.len();
        let tools = self.registry.all_tools();

        for iteration in 0..self.max_iterations {
            debug!(iteration, "Agent loop iteration");

            let response = self
                .llm
                .chat_with_tools(&self.system_prompt, &working.messages, &tools)
                .await?;
            let content = response.content.unwrap_or_default();

            if response.tool_calls.is_empty() {
                info!(iterations = iteration + 1, "Agent produced final answer");
                working.messages.push(Message::assistant(&content));
                return Ok(Self::diff(state, working, history_len));
            }

            working
                .messages
                .push(Message::assistant_with_tools(&content, response.tool_calls.clone()));

            for tool_call in &response.tool_calls {
                let output = self.execute_tool_call(tool_call, &mut working).await;
                working.messages.push(Message::tool(
                    &tool_call.id,
                    &tool_call.function.name,
                    &output,
                ));
            }
        }

        bail!("Agent exceeded iteration limit ({}).", self.max_iterations)
    }

    /// Run one tool call; failures become the tool's output
    async fn execute_tool_call(&self, tool_call: &ToolCall, state: &mut AgentState) -> String {
        let name = tool_call.function.name.as_str();
        let args = tool_call.function.arguments.as_str();
        info!(
            tool_name = %name,
            tool_args = %truncate(args, TOOL_ARGS_LOG_LIMIT),
            "Executing tool call"
        );

        match self.registry.execute(name, args, state).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool_name = %name, error = %e, "Tool execution failed");
                format!("Tool execution error: {e}")
            }
        }
    }

    fn diff(before: &AgentState, after: AgentState, history_len: usize) -> StateUpdate {
        let files = (after.files != before.files).then_some(after.files);
        let todos = (after.todos != before.todos).then_some(after.todos);
        let messages = after.messages.into_iter().skip(history_len).collect();
        StateUpdate {
            files,
            todos,
            messages,
        }
    }
}

/// Truncate on a char boundary
fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
