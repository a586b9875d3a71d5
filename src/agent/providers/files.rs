//! Files Provider - virtual filesystem held in the agent state
//!
//! Provides `ls`, `read_file`, `write_file` and `edit_file` tools.

use crate::agent::provider::ToolProvider;
use crate::agent::state::AgentState;
use crate::llm::ToolDefinition;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_READ_LIMIT: usize = 2000;

/// Provider for the in-state virtual filesystem
pub struct FilesProvider;

/// Arguments for `read_file` tool
#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    file_path: String,
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    DEFAULT_READ_LIMIT
}

/// Arguments for `write_file` tool
#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

/// Arguments for `edit_file` tool
#[derive(Debug, Deserialize)]
struct EditFileArgs {
    file_path: String,
    old_string: String,
    new_string: String,
    #[serde(default)]
    replace_all: bool,
}

/// Render `content` with 1-based line numbers, `cat -n` style
fn numbered(content: &str, offset: usize, limit: usize) -> String {
    content
        .lines()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(i, line)| format!("{:>6}\t{line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_file(state: &AgentState, args: &ReadFileArgs) -> String {
    let Some(content) = state.files.get(&args.file_path) else {
        return format!("Error: File '{}' not found", args.file_path);
    };
    if content.trim().is_empty() {
        return "System reminder: File exists but has empty contents".to_string();
    }
    let total = content.lines().count();
    if args.offset >= total {
        return format!(
            "Error: Line offset {} exceeds file length ({total} lines)",
            args.offset
        );
    }
    numbered(content, args.offset, args.limit)
}

fn edit_file(state: &mut AgentState, args: &EditFileArgs) -> String {
    let Some(content) = state.files.get(&args.file_path) else {
        return format!("Error: File '{}' not found", args.file_path);
    };

    let occurrences = content.matches(args.old_string.as_str()).count();
    if args.old_string.is_empty() || occurrences == 0 {
        return format!("Error: String not found in file: '{}'", args.old_string);
    }
    if occurrences > 1 && !args.replace_all {
        return format!(
            "Error: String '{}' appears {occurrences} times in file. Use replace_all=true to replace all instances, or provide a more specific string with surrounding context.",
            args.old_string
        );
    }

    let updated = if args.replace_all {
        content.replace(&args.old_string, &args.new_string)
    } else {
        content.replacen(&args.old_string, &args.new_string, 1)
    };
    state.files.insert(args.file_path.clone(), updated);

    if args.replace_all {
        format!(
            "Successfully replaced {occurrences} instance(s) of the string in '{}'",
            args.file_path
        )
    } else {
        format!("Successfully replaced string in '{}'", args.file_path)
    }
}

#[async_trait]
impl ToolProvider for FilesProvider {
    fn name(&self) -> &'static str {
        "files"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "ls".to_string(),
                description: "List all files in the virtual filesystem.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            ToolDefinition {
                name: "read_file".to_string(),
                description: "Read a file from the virtual filesystem. Output uses cat -n format with line numbers starting at 1. Use offset and limit to page through long files.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "Name of the file to read"
                        },
                        "offset": {
                            "type": "integer",
                            "description": "Line number to start reading from (0-based)"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of lines to read"
                        }
                    },
                    "required": ["file_path"]
                }),
            },
            ToolDefinition {
                name: "write_file".to_string(),
                description: "Create or overwrite a file in the virtual filesystem.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "Name of the file to write"
                        },
                        "content": {
                            "type": "string",
                            "description": "Content to write to the file"
                        }
                    },
                    "required": ["file_path", "content"]
                }),
            },
            ToolDefinition {
                name: "edit_file".to_string(),
                description: "Replace an exact string in a file. The old string must be unique unless replace_all is true.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "Name of the file to edit"
                        },
                        "old_string": {
                            "type": "string",
                            "description": "Exact text to replace"
                        },
                        "new_string": {
                            "type": "string",
                            "description": "Replacement text"
                        },
                        "replace_all": {
                            "type": "boolean",
                            "description": "Replace every occurrence"
                        }
                    },
                    "required": ["file_path", "old_string", "new_string"]
                }),
            },
        ]
    }

    fn can_handle(&self, tool_name: &str) -> bool {
        matches!(tool_name, "ls" | "read_file" | "write_file" | "edit_file")
    }

    async fn execute(
        &self,
        tool_name: &str,
        arguments: &str,
        state: &mut AgentState,
    ) -> Result<String> {
        debug!(tool = tool_name, "Executing files tool");

        match tool_name {
            "ls" => {
                let names: Vec<&str> = state.files.keys().map(String::as_str).collect();
                Ok(serde_json::to_string(&names)?)
            }
            "read_file" => {
                let args: ReadFileArgs = serde_json::from_str(arguments)?;
                Ok(read_file(state, &args))
            }
            "write_file" => {
                let args: WriteFileArgs = serde_json::from_str(arguments)?;
                let message = format!("Updated file {}", args.file_path);
                state.files.insert(args.file_path, args.content);
                Ok(message)
            }
            "edit_file" => {
                let args: EditFileArgs = serde_json::from_str(arguments)?;
                Ok(edit_file(state, &args))
            }
            _ => anyhow::bail!("Unknown files tool: {tool_name}"),
        }
    }
}
