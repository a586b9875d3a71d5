//! Todos Provider - the agent's plan for the current task
//!
//! Provides the `write_todos` tool. The list lives in the agent state, so it
//! is returned with the final state like the files are.

use crate::agent::provider::ToolProvider;
use crate::agent::state::AgentState;
use crate::llm::ToolDefinition;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write;
use tracing::{debug, info};

/// Status of a todo item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not started
    #[default]
    Pending,
    /// Being worked on
    InProgress,
    /// Done
    Completed,
    /// Dropped
    Cancelled,
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "[ ]"),
            Self::InProgress => write!(f, "[~]"),
            Self::Completed => write!(f, "[x]"),
            Self::Cancelled => write!(f, "[-]"),
        }
    }
}

/// A single step of the plan
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TodoItem {
    /// What the step does
    pub description: String,
    /// Current status
    pub status: TodoStatus,
}

impl TodoItem {
    /// Completed or cancelled
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.status, TodoStatus::Completed | TodoStatus::Cancelled)
    }
}

/// The agent's task list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoList {
    /// Items in plan order
    pub items: Vec<TodoItem>,
}

impl TodoList {
    /// Every item is done; an empty list is never complete
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(TodoItem::is_done)
    }

    /// The item marked in progress, if any
    #[must_use]
    pub fn current_task(&self) -> Option<&TodoItem> {
        self.items
            .iter()
            .find(|item| item.status == TodoStatus::InProgress)
    }

    /// Count completed items
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == TodoStatus::Completed)
            .count()
    }

    /// One line per item with its status marker
    #[must_use]
    pub fn render(&self) -> String {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {} {}", i + 1, item.status, item.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Arguments for `write_todos` tool
#[derive(Debug, Deserialize)]
struct WriteTodosArgs {
    todos: Vec<TodoItem>,
}

/// Provider for the `write_todos` planning tool
pub struct TodosProvider;

#[async_trait]
impl ToolProvider for TodosProvider {
    fn name(&self) -> &'static str {
        "todos"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "write_todos".to_string(),
            description: "Create or replace the task list for the current request. \
                Use it for multi-step work (reading several docs, writing and running code). \
                Write the plan before starting and keep statuses current."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "todos": {
                        "type": "array",
                        "description": "Full task list, replaces the previous one",
                        "items": {
                            "type": "object",
                            "properties": {
                                "description": {
                                    "type": "string",
                                    "description": "What the step does"
                                },
                                "status": {
                                    "type": "string",
                                    "enum": ["pending", "in_progress", "completed", "cancelled"],
                                    "description": "Step status. At most one step is in_progress."
                                }
                            },
                            "required": ["description", "status"]
                        }
                    }
                },
                "required": ["todos"]
            }),
        }]
    }

    fn can_handle(&self, tool_name: &str) -> bool {
        tool_name == "write_todos"
    }

    async fn execute(
        &self,
        tool_name: &str,
        arguments: &str,
        state: &mut AgentState,
    ) -> Result<String> {
        debug!(tool = tool_name, "Executing todos tool");

        if tool_name != "write_todos" {
            bail!("Unknown todos tool: {tool_name}");
        }

        let args: WriteTodosArgs = serde_json::from_str(arguments)?;
        let in_progress = args
            .todos
            .iter()
            .filter(|item| item.status == TodoStatus::InProgress)
            .count();
        if in_progress > 1 {
            bail!("Only one task can be in_progress, got {in_progress}");
        }

        state.todos = TodoList { items: args.todos };
        let todos = &state.todos;
        let completed = todos.completed_count();
        let total = todos.items.len();
        let current = todos.current_task().map(|t| t.description.as_str());

        info!(completed, total, current = ?current, "Todos updated");

        let mut response = if todos.is_complete() {
            format!("All tasks done ({completed}/{total})")
        } else {
            format!("Task list updated ({completed}/{total} completed)")
        };
        if let Some(current) = current {
            // Writing to a String cannot fail
            let _ = write!(response, "\nCurrent task: {current}");
        }
        Ok(response)
    }
}
