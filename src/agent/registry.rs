//! Tool Registry - manages all tool providers
//!
//! Collects tools from all registered providers and routes tool calls appropriately.

use super::provider::ToolProvider;
use super::state::AgentState;
use crate::llm::ToolDefinition;
use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

/// Registry that manages multiple tool providers
pub struct ToolRegistry {
    providers: Vec<Box<dyn ToolProvider>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a new tool provider
    pub fn register(&mut self, provider: Box<dyn ToolProvider>) {
        info!(provider = provider.name(), "Registered tool provider");
        self.providers.push(provider);
    }

    /// Get all tools from all registered providers
    #[must_use]
    pub fn all_tools(&self) -> Vec<ToolDefinition> {
        self.providers.iter().flat_map(|p| p.tools()).collect()
    }

    /// Find a provider and execute the tool
    ///
    /// # Errors
    ///
    /// Returns an error if no provider can handle the tool or if execution fails.
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: &str,
        state: &mut AgentState,
    ) -> Result<String> {
        let Some(provider) = self.providers.iter().find(|p| p.can_handle(tool_name)) else {
            warn!(tool = tool_name, "No provider found for tool");
            return Err(anyhow!("Unknown tool: {tool_name}"));
        };

        debug!(tool = tool_name, provider = provider.name(), "Found provider for tool");
        provider.execute(tool_name, arguments, state).await
    }

    /// Check if any provider can handle the tool
    #[must_use]
    pub fn can_handle(&self, tool_name: &str) -> bool {
        self.providers.iter().any(|p| p.can_handle(tool_name))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
