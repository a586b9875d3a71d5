//! guMCP documentation loader
//!
//! Seeds the agent's virtual filesystem with the generated integration docs
//! unless the caller already provided files of their own.

use std::path::Path;

use glob::Pattern;
use tracing::{info, instrument, warn};

use super::state::{AgentState, Files, StateUpdate};
use crate::config::GUMCP_DOCS_PATTERN;

/// Add the documentation files to the state if it holds no files yet.
///
/// Returns an empty update when `state.files` is non-empty, so user-provided
/// files are never overwritten.
pub async fn add_gumcp_docs_to_state(state: &AgentState, docs_dir: &Path) -> StateUpdate {
    if !state.files.is_empty() {
        return StateUpdate::default();
    }
    StateUpdate::files(load_gumcp_files(docs_dir).await)
}

/// Read every `gumcp*.txt` file in `docs_dir`.
///
/// A missing directory or an unreadable file is logged and skipped.
#[instrument(fields(dir = %docs_dir.display()))]
pub async fn load_gumcp_files(docs_dir: &Path) -> Files {
    let mut files = Files::new();

    let pattern = match Pattern::new(GUMCP_DOCS_PATTERN) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Invalid documentation pattern");
            return files;
        }
    };

    let mut entries = match tokio::fs::read_dir(docs_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Documentation directory not found");
            return files;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to list documentation directory");
                break;
            }
        };

        let filename = entry.file_name().to_string_lossy().to_string();
        if !pattern.matches(&filename) {
            continue;
        }
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        match tokio::fs::read_to_string(entry.path()).await {
            Ok(content) => {
                files.insert(filename, content);
            }
            Err(e) => warn!(file = %filename, error = %e, "Could not read documentation file"),
        }
    }

    info!(
        count = files.len(),
        files = ?files.keys().collect::<Vec<_>>(),
        "Loaded guMCP documentation files"
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_populated_state_is_left_alone() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("gumcp_gmail_docs.txt"), "docs")?;

        let mut state = AgentState::default();
        state.files.insert("a.txt".to_string(), "x".to_string());

        let update = add_gumcp_docs_to_state(&state, dir.path()).await;
        assert!(update.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_loads_only_matching_files() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("gumcp_a.txt"), "alpha")?;
        fs::write(dir.path().join("gumcp_b.txt"), "beta")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;
        fs::write(dir.path().join("gumcp_c.md"), "ignored")?;
        fs::create_dir(dir.path().join("gumcp_dir.txt"))?;

        let update = add_gumcp_docs_to_state(&AgentState::default(), dir.path()).await;

        let mut expected = Files::new();
        expected.insert("gumcp_a.txt".to_string(), "alpha".to_string());
        expected.insert("gumcp_b.txt".to_string(), "beta".to_string());
        assert_eq!(update.files, Some(expected));
        assert!(update.messages.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_directory_yields_empty_mapping() {
        let files = load_gumcp_files(Path::new("/nonexistent/gumcp_docs")).await;
        assert!(files.is_empty());
    }
}
