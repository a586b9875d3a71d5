//! Agent graph: ordered nodes sharing one state
//!
//! The graph runs `add_gumcp_docs` then `agent`. Each node returns a
//! [`StateUpdate`] that is applied before the next node runs.

use super::documents::add_gumcp_docs_to_state;
use super::executor::AgentExecutor;
use super::prompt::compose_system_prompt;
use super::providers::{CodeExecutorProvider, FilesProvider, TodosProvider};
use super::registry::ToolRegistry;
use super::state::{AgentState, StateUpdate};
use crate::config::Settings;
use crate::llm::LlmClient;
use crate::sandbox::SandboxManager;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A step of the graph
#[async_trait]
pub trait GraphNode: Send + Sync {
    /// Node name for logging
    fn name(&self) -> &'static str;

    /// Compute the node's update from the current state
    async fn run(&self, state: &AgentState) -> Result<StateUpdate>;
}

/// Seeds `files` with the guMCP documentation
pub struct DocsNode {
    docs_dir: PathBuf,
}

impl DocsNode {
    /// Node reading documentation from `docs_dir`
    #[must_use]
    pub const fn new(docs_dir: PathBuf) -> Self {
        Self { docs_dir }
    }
}

#[async_trait]
impl GraphNode for DocsNode {
    fn name(&self) -> &'static str {
        "add_gumcp_docs"
    }

    async fn run(&self, state: &AgentState) -> Result<StateUpdate> {
        Ok(add_gumcp_docs_to_state(state, &self.docs_dir).await)
    }
}

/// Runs the tool-calling agent
pub struct AgentNode {
    executor: AgentExecutor,
}

impl AgentNode {
    /// Node driving `executor`
    #[must_use]
    pub const fn new(executor: AgentExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl GraphNode for AgentNode {
    fn name(&self) -> &'static str {
        "agent"
    }

    async fn run(&self, state: &AgentState) -> Result<StateUpdate> {
        self.executor.run(state).await
    }
}

/// Linear graph of nodes
pub struct AgentGraph {
    nodes: Vec<Box<dyn GraphNode>>,
}

impl AgentGraph {
    /// Graph running `nodes` in order
    #[must_use]
    pub fn new(nodes: Vec<Box<dyn GraphNode>>) -> Self {
        Self { nodes }
    }

    /// Node names in execution order
    #[must_use]
    pub fn node_names(&self) -> Vec<&'static str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }

    /// Run every node and return the final state
    ///
    /// # Errors
    ///
    /// Stops at the first node that fails and returns its error.
    pub async fn invoke(&self, mut state: AgentState) -> Result<AgentState> {
        for node in &self.nodes {
            debug!(node = node.name(), "Running graph node");
            let update = node.run(&state).await?;
            state.apply(update);
        }
        info!(messages = state.messages.len(), files = state.files.len(), "Graph run finished");
        Ok(state)
    }
}

/// Assemble the default graph: documentation loading, then the agent with
/// the planning, files and code execution tools.
pub async fn build_agent_graph(
    settings: &Settings,
    llm: Arc<LlmClient>,
    sandbox: Arc<SandboxManager>,
) -> AgentGraph {
    let system_prompt = compose_system_prompt(&settings.system_prompt_path()).await;

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(TodosProvider));
    registry.register(Box::new(FilesProvider));
    registry.register(Box::new(CodeExecutorProvider::new(sandbox)));

    let executor = AgentExecutor::new(llm, registry, system_prompt, settings.agent_max_iterations);

    AgentGraph::new(vec![
        Box::new(DocsNode::new(settings.gumcp_docs_dir())),
        Box::new(AgentNode::new(executor)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    struct Echo;

    #[async_trait]
    impl GraphNode for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn run(&self, state: &AgentState) -> Result<StateUpdate> {
            Ok(StateUpdate {
                files: None,
                todos: None,
                messages: vec![Message::assistant(&format!(
                    "{} files",
                    state.files.len()
                ))],
            })
        }
    }

    #[tokio::test]
    async fn test_updates_are_applied_between_nodes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("gumcp_gmail_docs.txt"), "gmail")?;

        let graph = AgentGraph::new(vec![
            Box::new(DocsNode::new(dir.path().to_path_buf())),
            Box::new(Echo),
        ]);
        assert_eq!(graph.node_names(), vec!["add_gumcp_docs", "echo"]);

        let state = graph.invoke(AgentState::with_task("hi")).await?;
        assert_eq!(state.final_answer(), Some("1 files"));
        Ok(())
    }
}
