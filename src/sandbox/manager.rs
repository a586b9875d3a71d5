//! Sandbox lifecycle: one sandbox per execution, always killed afterwards.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{Execution, SandboxBackend, SandboxError, SandboxHandle, SandboxRequest};
use crate::config::Settings;

/// Provisioning applied to every sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Template to boot
    pub template: String,
    /// Lifetime ceiling in seconds
    pub timeout_secs: u64,
    /// Injected environment variables
    pub env_vars: Vec<(String, String)>,
    /// pip packages installed before the code runs
    pub packages: Vec<String>,
}

impl SandboxConfig {
    /// Build the provisioning from settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            template: settings.sandbox_template.clone(),
            timeout_secs: settings.sandbox_timeout_secs,
            env_vars: settings.sandbox_env_vars(),
            packages: settings.sandbox_packages(),
        }
    }

    fn request(&self) -> SandboxRequest {
        SandboxRequest {
            template: self.template.clone(),
            timeout_secs: self.timeout_secs,
            env_vars: self.env_vars.clone(),
        }
    }
}

/// A live sandbox that must be released.
///
/// [`SandboxLease::release`] kills the sandbox and waits for it. A lease that
/// is dropped without being released (the owning future was cancelled)
/// schedules the kill on the current tokio runtime instead.
pub struct SandboxLease {
    backend: Arc<dyn SandboxBackend>,
    handle: Option<SandboxHandle>,
}

impl SandboxLease {
    /// The leased sandbox
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::Protocol` if the lease was already released.
    pub fn handle(&self) -> Result<&SandboxHandle, SandboxError> {
        self.handle
            .as_ref()
            .ok_or_else(|| SandboxError::Protocol("sandbox lease already released".to_string()))
    }

    /// Kill the sandbox. Failures are logged; the sandbox's own timeout is
    /// the backstop.
    ///
    /// The handle stays in the lease until the kill returns, so a release
    /// cancelled mid-flight still falls back to the kill in `Drop`.
    pub async fn release(mut self) {
        if let Some(handle) = self.handle.as_ref() {
            kill_logged(self.backend.as_ref(), handle).await;
            self.handle = None;
        }
    }
}

impl Drop for SandboxLease {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(sandbox_id = %handle.sandbox_id, "Sandbox lease dropped, killing in background");
                let backend = Arc::clone(&self.backend);
                runtime.spawn(async move {
                    kill_logged(backend.as_ref(), &handle).await;
                });
            }
            Err(_) => {
                warn!(
                    sandbox_id = %handle.sandbox_id,
                    "Sandbox lease dropped outside a runtime, sandbox lives until its timeout"
                );
            }
        }
    }
}

async fn kill_logged(backend: &dyn SandboxBackend, handle: &SandboxHandle) {
    match backend.kill(handle).await {
        Ok(()) => info!(sandbox_id = %handle.sandbox_id, "Sandbox destroyed"),
        Err(e) => warn!(sandbox_id = %handle.sandbox_id, error = %e, "Failed to destroy sandbox"),
    }
}

/// Creates, provisions and tears down sandboxes
#[derive(Clone)]
pub struct SandboxManager {
    backend: Arc<dyn SandboxBackend>,
    config: SandboxConfig,
}

impl SandboxManager {
    /// Create a manager over `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn SandboxBackend>, config: SandboxConfig) -> Self {
        Self { backend, config }
    }

    /// Create a sandbox and wrap it in a lease
    ///
    /// # Errors
    ///
    /// Returns the backend's error if creation fails.
    #[instrument(skip(self), fields(template = %self.config.template))]
    pub async fn acquire(&self) -> Result<SandboxLease, SandboxError> {
        let handle = self.backend.create(&self.config.request()).await?;
        info!(sandbox_id = %handle.sandbox_id, "Sandbox created");
        Ok(SandboxLease {
            backend: Arc::clone(&self.backend),
            handle: Some(handle),
        })
    }

    /// Run `code` in a fresh sandbox.
    ///
    /// Installs the configured packages first, then executes the code. The
    /// sandbox is killed on every path out of this function.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::EmptyCode` for blank code without creating a
    /// sandbox, otherwise the creation, installation or execution error.
    #[instrument(skip(self, code), fields(code_len = code.len()))]
    pub async fn run_python_code(&self, code: &str) -> Result<Execution, SandboxError> {
        if code.trim().is_empty() {
            return Err(SandboxError::EmptyCode);
        }

        let lease = self.acquire().await?;
        let outcome = self.execute_leased(&lease, code).await;
        lease.release().await;
        outcome
    }

    async fn execute_leased(
        &self,
        lease: &SandboxLease,
        code: &str,
    ) -> Result<Execution, SandboxError> {
        let handle = lease.handle()?;

        if !self.config.packages.is_empty() {
            debug!(packages = ?self.config.packages, "Installing packages");
            self.backend
                .install_packages(handle, &self.config.packages)
                .await?;
        }

        let execution = self.backend.run_code(handle, code).await?;
        debug!(
            stdout_chunks = execution.logs.stdout.len(),
            stderr_chunks = execution.logs.stderr.len(),
            has_error = execution.error.is_some(),
            "Code executed"
        );
        Ok(execution)
    }
}
