//! System prompt loading

use std::path::Path;

use tracing::{debug, warn};

/// Instructions for the built-in tools, appended after the prompt file
pub const TOOL_INSTRUCTIONS: &str = r"## Planning
For multi-step tasks call `write_todos` with the full plan before starting, then
update statuses as you go. Keep at most one task `in_progress`.

## Files
You have a virtual filesystem shared with the user. It may already contain guMCP
integration documentation (files named `gumcp_<integration>_docs.txt`).
- `ls` lists files, `read_file` reads one with line numbers
- `write_file` creates or overwrites a file, `edit_file` replaces exact text

## Code execution
- `python_code_executor` runs Python code in a fresh, isolated sandbox
- `execute_file` runs the content of a file from the virtual filesystem
Each call starts a new sandbox: nothing persists between calls. The environment
variables `GUMCP_CREDENTIALS` and `ZAI_API_KEY` are available to the code.";

/// Read the system prompt file, followed by a blank line.
///
/// An unreadable file is logged and yields an empty string.
pub async fn load_system_prompt(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            debug!(path = %path.display(), "Loaded system prompt");
            content + "\n\n"
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read system prompt");
            String::new()
        }
    }
}

/// Full prompt: file content plus tool instructions
pub async fn compose_system_prompt(path: &Path) -> String {
    load_system_prompt(path).await + TOOL_INSTRUCTIONS
}
