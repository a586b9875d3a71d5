//! Agent module: a tool-calling model working over a virtual filesystem
//!
//! This module provides:
//! - Shared state and the graph that threads it through nodes
//! - guMCP documentation loading into the virtual filesystem
//! - Tool providers for files and sandboxed code execution
//! - The iterative executor talking to the model

/// guMCP documentation loading
pub mod documents;
/// Executor for iterative task processing
pub mod executor;
/// Node graph driving a run
pub mod graph;
/// System prompt loading
pub mod prompt;
/// Tool provider trait
pub mod provider;
/// Built-in tool providers (Files, Code executor)
pub mod providers;
/// Registry for managing available tools
pub mod registry;
/// Agent state and node updates
pub mod state;

pub use documents::{add_gumcp_docs_to_state, load_gumcp_files};
pub use executor::AgentExecutor;
pub use graph::{build_agent_graph, AgentGraph, AgentNode, DocsNode, GraphNode};
pub use prompt::load_system_prompt;
pub use provider::ToolProvider;
pub use providers::{CodeExecutorProvider, FilesProvider, EXECUTION_ERROR_PREFIX};
pub use registry::ToolRegistry;
pub use state::{AgentState, Files, StateUpdate};
