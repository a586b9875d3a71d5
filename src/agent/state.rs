//! Shared agent state threaded through the graph

use std::collections::BTreeMap;

use super::providers::TodoList;
use crate::llm::Message;

/// Filename → content mapping visible to the agent
pub type Files = BTreeMap<String, String>;

/// State owned by the graph for the duration of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentState {
    /// Conversation history
    pub messages: Vec<Message>,
    /// Virtual filesystem
    pub files: Files,
    /// Plan written with `write_todos`
    pub todos: TodoList,
}

impl AgentState {
    /// State holding a single user task
    #[must_use]
    pub fn with_task(task: &str) -> Self {
        Self {
            messages: vec![Message::user(task)],
            files: Files::new(),
            todos: TodoList::default(),
        }
    }

    /// Merge a node's update into the state
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(files) = update.files {
            self.files = files;
        }
        if let Some(todos) = update.todos {
            self.todos = todos;
        }
        self.messages.extend(update.messages);
    }

    /// Content of the last assistant message without tool calls
    #[must_use]
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "assistant" && m.tool_calls.is_none())
            .map(|m| m.content.as_str())
    }
}

/// Partial update returned by a graph node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    /// Full replacement of `files`, if the node changed them
    pub files: Option<Files>,
    /// Full replacement of `todos`, if the node changed them
    pub todos: Option<TodoList>,
    /// Messages appended to the history
    pub messages: Vec<Message>,
}

impl StateUpdate {
    /// Update replacing the files mapping
    #[must_use]
    pub const fn files(files: Files) -> Self {
        Self {
            files: Some(files),
            todos: None,
            messages: Vec::new(),
        }
    }

    /// Whether applying this update is a no-op
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_none() && self.todos.is_none() && self.messages.is_empty()
    }
}
