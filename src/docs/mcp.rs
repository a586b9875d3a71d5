//! guMCP tool discovery over MCP streamable HTTP

use async_trait::async_trait;
use rmcp::model::Tool;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::catalog::{ToolCatalog, ToolRecord};
use super::DocsError;

/// Catalog backed by the hosted guMCP servers
#[derive(Debug, Clone)]
pub struct McpToolCatalog {
    base_url: String,
    credentials: String,
}

impl McpToolCatalog {
    /// Catalog for `credentials` on the server at `base_url`
    #[must_use]
    pub fn new(base_url: &str, credentials: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// MCP endpoint of `integration`
    #[must_use]
    pub fn endpoint(&self, integration: &str) -> String {
        format!("{}/{integration}/{}/mcp", self.base_url, self.credentials)
    }
}

/// Convert an MCP tool into a record; the arguments are the schema's
/// `properties`, or an empty object when the schema has none.
#[must_use]
pub fn tool_record(tool: &Tool) -> ToolRecord {
    let parameters = tool
        .input_schema
        .get("properties")
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    ToolRecord {
        name: tool.name.to_string(),
        description: tool
            .description
            .as_deref()
            .map(str::to_string)
            .unwrap_or_default(),
        parameters,
    }
}

#[async_trait]
impl ToolCatalog for McpToolCatalog {
    #[instrument(skip(self))]
    async fn list_tools(&self, integration: &str) -> Result<Vec<ToolRecord>, DocsError> {
        let transport = StreamableHttpClientTransport::from_uri(self.endpoint(integration));
        let client = ()
            .serve(transport)
            .await
            .map_err(|e| DocsError::Registry(format!("failed to connect: {e}")))?;
        debug!("MCP session initialized");

        let listed = client.list_all_tools().await;

        if let Err(e) = client.cancel().await {
            warn!(error = %e, "Failed to close MCP session");
        }

        let tools = listed.map_err(|e| DocsError::Registry(format!("failed to list tools: {e}")))?;
        info!(count = tools.len(), "Discovered tools");
        Ok(tools.iter().map(tool_record).collect())
    }
}
