//! Tool discovery seam

use async_trait::async_trait;
use serde_json::Value;

use super::DocsError;

/// A tool as published by an integration
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRecord {
    /// Tool name
    pub name: String,
    /// Human readable description
    pub description: String,
    /// JSON schema of the arguments (the `properties` object)
    pub parameters: Value,
}

/// Lists the tools exposed by an integration
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// Discover every tool of `integration`
    async fn list_tools(&self, integration: &str) -> Result<Vec<ToolRecord>, DocsError>;
}
