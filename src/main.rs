use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use gumcp_agent::agent::{build_agent_graph, AgentState};
use gumcp_agent::config::Settings;
use gumcp_agent::llm::LlmClient;
use gumcp_agent::logging::init_logging;
use gumcp_agent::sandbox::{E2bBackend, SandboxConfig, SandboxManager};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Run the guMCP agent on a single task
#[derive(Debug, Parser)]
#[command(name = "gumcp-agent", version, about)]
struct Cli {
    /// Task for the agent; read from stdin when omitted
    task: Option<String>,

    /// Preload a file into the agent's virtual filesystem (NAME=PATH).
    /// Providing any file disables guMCP documentation loading.
    #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_file_arg)]
    files: Vec<(String, PathBuf)>,
}

fn parse_file_arg(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to compile redaction patterns: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(Cli::parse()).await {
        error!(error = %e, "Agent run failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new().context("Failed to load configuration")?;
    info!("Configuration loaded successfully.");
    if !settings.validate() {
        bail!("ZAI_API_KEY environment variable not set");
    }

    let task = match cli.task {
        Some(task) => task,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read task from stdin")?;
            buf
        }
    };
    if task.trim().is_empty() {
        bail!("No task given");
    }

    let mut state = AgentState::with_task(task.trim());
    for (name, path) in &cli.files {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        state.files.insert(name.clone(), content);
    }

    let llm = Arc::new(LlmClient::new(&settings));
    let sandbox = Arc::new(SandboxManager::new(
        Arc::new(E2bBackend::new(&settings)),
        SandboxConfig::from_settings(&settings),
    ));
    let graph = build_agent_graph(&settings, llm, sandbox).await;

    let final_state = graph.invoke(state).await?;
    match final_state.final_answer() {
        Some(answer) => println!("{answer}"),
        None => bail!("Agent finished without an answer"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_arg() {
        assert_eq!(
            parse_file_arg("main.py=./src/main.py"),
            Ok(("main.py".to_string(), PathBuf::from("./src/main.py")))
        );
        assert!(parse_file_arg("main.py").is_err());
        assert!(parse_file_arg("=x").is_err());
    }

    #[test]
    fn test_cli_collects_files() {
        let cli = Cli::try_parse_from(["gumcp-agent", "do it", "--file", "a=b", "--file", "c=d"]);
        assert!(matches!(cli, Ok(ref c) if c.files.len() == 2 && c.task.as_deref() == Some("do it")));
    }
}
