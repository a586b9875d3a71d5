//! guMCP documentation generator
//!
//! Reads the list of integrations, discovers the tools each one exposes and
//! writes a Markdown page per integration into the documentation directory.

mod catalog;
mod generator;
mod integrations;
mod mcp;
mod render;

use std::path::PathBuf;

use thiserror::Error;

pub use catalog::{ToolCatalog, ToolRecord};
#[cfg(test)]
pub use catalog::MockToolCatalog;
pub use generator::{docs_file_path, DocsGenerator};
pub use integrations::{parse_integrations, read_integrations_list, title_case};
pub use mcp::{tool_record, McpToolCatalog};
pub use render::{generate_documentation, GENERATED_AT_FORMAT};

/// Errors raised while generating documentation
#[derive(Debug, Error)]
pub enum DocsError {
    /// `GUMCP_CREDENTIALS` is not set
    #[error("GUMCP_CREDENTIALS environment variable not set")]
    MissingCredentials,
    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
    /// The integrations list does not exist
    #[error("integrations list not found: {}", .0.display())]
    ListNotFound(PathBuf),
    /// The requested integration is not in the list
    #[error("Integration '{name}' not found. Available: {}", .available.join(", "))]
    UnknownIntegration {
        /// Requested name
        name: String,
        /// Names from the list
        available: Vec<String>,
    },
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Tool discovery failed
    #[error("tool discovery failed: {0}")]
    Registry(String),
}
