//! Remote sandboxes for code execution
//!
//! A sandbox is created per execution and killed afterwards, see
//! [`SandboxManager::run_python_code`].

mod e2b;
mod execution;
mod manager;

pub use e2b::E2bBackend;
pub use execution::{Execution, ExecutionError, ExecutionResult, Logs};
pub use manager::{SandboxConfig, SandboxLease, SandboxManager};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while provisioning or using a sandbox
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Refused to run an empty code string
    #[error("no code to execute")]
    EmptyCode,
    /// Credentials for the sandbox service are missing
    #[error("missing sandbox configuration: {0}")]
    MissingConfig(String),
    /// The sandbox service answered with a non-success status
    #[error("sandbox API error: {0}")]
    Api(String),
    /// Transport failure talking to the sandbox service
    #[error("sandbox network error: {0}")]
    Network(String),
    /// The execution stream could not be understood
    #[error("sandbox protocol error: {0}")]
    Protocol(String),
    /// Package installation inside the sandbox failed
    #[error("package installation failed: {0}")]
    Install(String),
}

/// Parameters for creating a sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRequest {
    /// Template to boot
    pub template: String,
    /// Lifetime ceiling in seconds
    pub timeout_secs: u64,
    /// Environment variables visible to executed code
    pub env_vars: Vec<(String, String)>,
}

/// Handle to a live sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    /// Remote sandbox id
    pub sandbox_id: String,
    /// Token for the in-sandbox daemon, when the service issues one
    pub access_token: Option<String>,
}

/// Remote sandbox service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Boot a new sandbox
    async fn create(&self, request: &SandboxRequest) -> Result<SandboxHandle, SandboxError>;

    /// Run Python code and wait for the complete execution
    async fn run_code(&self, handle: &SandboxHandle, code: &str)
        -> Result<Execution, SandboxError>;

    /// Destroy the sandbox
    async fn kill(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;

    /// Install pip packages through the interpreter
    async fn install_packages(
        &self,
        handle: &SandboxHandle,
        packages: &[String],
    ) -> Result<(), SandboxError> {
        let execution = self.run_code(handle, &pip_install_code(packages)).await?;
        match execution.error {
            Some(err) => Err(SandboxError::Install(format!("{}: {}", err.name, err.value))),
            None => Ok(()),
        }
    }
}

/// Python snippet running pip for `packages` in the interpreter's environment
#[must_use]
pub fn pip_install_code(packages: &[String]) -> String {
    let quoted: Vec<String> = packages
        .iter()
        .map(|p| serde_json::Value::String(p.clone()).to_string())
        .collect();
    format!(
        "import subprocess, sys\nsubprocess.check_call([sys.executable, \"-m\", \"pip\", \"install\", \"-q\", {}])",
        quoted.join(", ")
    )
}
