use clap::Parser;
use dotenvy::dotenv;
use gumcp_agent::config::Settings;
use gumcp_agent::docs::{DocsError, DocsGenerator, McpToolCatalog};
use gumcp_agent::logging::init_logging;
use std::sync::Arc;
use tracing::info;

/// Generate guMCP tool documentation for the listed integrations
#[derive(Debug, Parser)]
#[command(name = "generate-gumcp-docs", version, about)]
struct Cli {
    /// Only document this integration (must appear in gumcp_list.txt)
    integration: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to compile redaction patterns: {e}");
        std::process::exit(1);
    }

    let cli = Cli::parse();
    match run(cli.integration.as_deref()).await {
        Ok(()) => {}
        Err(DocsError::MissingCredentials) => {
            eprintln!("ERROR: GUMCP_CREDENTIALS environment variable not set.");
            eprintln!("Please set it to use guMCP integrations.");
            std::process::exit(1);
        }
        Err(e @ DocsError::UnknownIntegration { .. }) => println!("{e}"),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(selection: Option<&str>) -> Result<(), DocsError> {
    let settings = Settings::new().map_err(|e| DocsError::Config(e.to_string()))?;
    let credentials = settings
        .gumcp_credentials
        .clone()
        .ok_or(DocsError::MissingCredentials)?;

    let catalog = McpToolCatalog::new(&settings.gumcp_base_url, credentials);
    let generator = DocsGenerator::new(
        Arc::new(catalog),
        settings.gumcp_docs_dir(),
        settings.integrations_list_path(),
    );

    let written = generator.run(selection).await?;
    for path in &written {
        println!("Documentation generated: {}", path.display());
    }
    info!(files = written.len(), "Documentation run finished");
    Ok(())
}
