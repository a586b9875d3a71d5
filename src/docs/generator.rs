//! Documentation generation run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, instrument, warn};

use super::catalog::ToolCatalog;
use super::integrations::read_integrations_list;
use super::render::generate_documentation;
use super::DocsError;

/// Path of the documentation file for `integration`
#[must_use]
pub fn docs_file_path(docs_dir: &Path, integration: &str) -> PathBuf {
    docs_dir.join(format!("gumcp_{integration}_docs.txt"))
}

/// Discovers tools and writes one documentation file per integration
pub struct DocsGenerator {
    catalog: Arc<dyn ToolCatalog>,
    docs_dir: PathBuf,
    list_path: PathBuf,
}

impl DocsGenerator {
    /// Generator writing into `docs_dir`, reading integrations from `list_path`
    #[must_use]
    pub fn new(catalog: Arc<dyn ToolCatalog>, docs_dir: PathBuf, list_path: PathBuf) -> Self {
        Self {
            catalog,
            docs_dir,
            list_path,
        }
    }

    /// Generate documentation for `selection`, or for every listed
    /// integration when `None`. Returns the files written.
    ///
    /// # Errors
    ///
    /// Returns `DocsError::ListNotFound` when the list is missing and
    /// `DocsError::UnknownIntegration` when `selection` is not listed.
    /// Failures of individual integrations are logged and skipped.
    #[instrument(skip(self))]
    pub async fn run(&self, selection: Option<&str>) -> Result<Vec<PathBuf>, DocsError> {
        let integrations = read_integrations_list(&self.list_path).await?;
        if integrations.is_empty() {
            warn!(list = %self.list_path.display(), "No integrations found");
            return Ok(Vec::new());
        }
        info!(
            count = integrations.len(),
            integrations = %integrations.join(", "),
            "Found integrations to document"
        );

        let selected: Vec<String> = match selection {
            Some(name) if integrations.iter().any(|i| i == name) => vec![name.to_string()],
            Some(name) => {
                return Err(DocsError::UnknownIntegration {
                    name: name.to_string(),
                    available: integrations,
                })
            }
            None => integrations,
        };

        let mut written = Vec::new();
        for integration in &selected {
            match self.document(integration).await {
                Ok(path) => written.push(path),
                Err(e) => warn!(integration = %integration, error = %e, "Skipping integration"),
            }
        }
        Ok(written)
    }

    /// Discover and document one integration
    async fn document(&self, integration: &str) -> Result<PathBuf, DocsError> {
        let tools = self.catalog.list_tools(integration).await?;
        for (i, tool) in tools.iter().enumerate() {
            info!(index = i + 1, tool = %tool.name, description = %tool.description, "Tool");
        }

        let doc = generate_documentation(&tools, integration, Local::now().naive_local());
        let path = docs_file_path(&self.docs_dir, integration);
        tokio::fs::write(&path, doc).await?;
        info!(integration, tools = tools.len(), path = %path.display(), "Documentation generated");
        Ok(path)
    }
}
