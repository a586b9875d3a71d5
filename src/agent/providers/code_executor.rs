//! Code Executor Provider - runs Python in a fresh remote sandbox
//!
//! Provides `python_code_executor` and `execute_file` tools. Every failure is
//! reported back to the model as text, never as a tool error.

use crate::agent::provider::ToolProvider;
use crate::agent::state::AgentState;
use crate::llm::ToolDefinition;
use crate::sandbox::SandboxManager;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix of every failure returned by the code execution tools
pub const EXECUTION_ERROR_PREFIX: &str = "Error executing code: ";

/// Provider for sandboxed code execution
pub struct CodeExecutorProvider {
    sandbox: Arc<SandboxManager>,
}

impl CodeExecutorProvider {
    /// Create a provider running code through `sandbox`
    #[must_use]
    pub const fn new(sandbox: Arc<SandboxManager>) -> Self {
        Self { sandbox }
    }

    /// Run `code` and render the outcome as tool output
    pub async fn run(&self, code: &str) -> String {
        match self.sandbox.run_python_code(code).await {
            Ok(execution) => execution.to_string(),
            Err(e) => {
                warn!(error = %e, "Code execution failed");
                format!("{EXECUTION_ERROR_PREFIX}{e}")
            }
        }
    }
}

/// Arguments for `python_code_executor` tool
#[derive(Debug, Deserialize)]
struct CodeArgs {
    #[serde(default)]
    code: String,
}

/// Arguments for `execute_file` tool
#[derive(Debug, Deserialize)]
struct ExecuteFileArgs {
    filename: String,
}

#[async_trait]
impl ToolProvider for CodeExecutorProvider {
    fn name(&self) -> &'static str {
        "code_executor"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "python_code_executor".to_string(),
                description: "Execute Python code in a fresh isolated sandbox and return stdout, stderr, results and errors. GUMCP_CREDENTIALS and ZAI_API_KEY are available as environment variables. Nothing persists between calls.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "The Python code to execute"
                        }
                    },
                    "required": ["code"]
                }),
            },
            ToolDefinition {
                name: "execute_file".to_string(),
                description: "Execute the content of a file from the virtual filesystem as Python code in a fresh isolated sandbox.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "filename": {
                            "type": "string",
                            "description": "Name of the file in the virtual filesystem"
                        }
                    },
                    "required": ["filename"]
                }),
            },
        ]
    }

    fn can_handle(&self, tool_name: &str) -> bool {
        matches!(tool_name, "python_code_executor" | "execute_file")
    }

    async fn execute(
        &self,
        tool_name: &str,
        arguments: &str,
        state: &mut AgentState,
    ) -> Result<String> {
        debug!(tool = tool_name, "Executing code tool");

        match tool_name {
            "python_code_executor" => {
                let args: CodeArgs = serde_json::from_str(arguments)?;
                Ok(self.run(&args.code).await)
            }
            "execute_file" => {
                let args: ExecuteFileArgs = serde_json::from_str(arguments)?;
                match state.files.get(&args.filename) {
                    Some(content) if !content.trim().is_empty() => Ok(self.run(content).await),
                    _ => Ok(format!(
                        "{EXECUTION_ERROR_PREFIX}no content found for file '{}'",
                        args.filename
                    )),
                }
            }
            _ => anyhow::bail!("Unknown code tool: {tool_name}"),
        }
    }
}
