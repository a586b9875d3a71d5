//! Configuration and settings management
//!
//! Loads settings from environment variables and optional config files and
//! defines model, sandbox and path constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Default chat model served by ZAI
pub const DEFAULT_MODEL_NAME: &str = "glm-4.6";
/// Default sampling temperature for the chat model
pub const DEFAULT_MODEL_TEMPERATURE: f32 = 0.6;
/// OpenAI-compatible base URL of the ZAI coding API
pub const DEFAULT_MODEL_API_BASE: &str = "https://api.z.ai/api/coding/paas/v4/";
/// Maximum output tokens requested per model call
pub const DEFAULT_MODEL_MAX_TOKENS: u32 = 32_000;

/// Directory holding prompts and guMCP documentation
pub const DEFAULT_RESOURCES_DIR: &str = "resources";
/// Glob matched against file names when loading documentation into state
pub const GUMCP_DOCS_PATTERN: &str = "gumcp*.txt";
/// File listing the integrations to document
pub const GUMCP_LIST_FILE: &str = "gumcp_list.txt";
/// Base URL of the hosted guMCP servers
pub const DEFAULT_GUMCP_BASE_URL: &str = "https://mcp.gumloop.com";

/// E2B control plane
pub const DEFAULT_E2B_API_URL: &str = "https://api.e2b.dev";
/// Domain under which sandbox ports are exposed
pub const DEFAULT_E2B_DOMAIN: &str = "e2b.app";
/// Code interpreter template
pub const DEFAULT_SANDBOX_TEMPLATE: &str = "code-interpreter-v1";
/// Lifetime ceiling of a sandbox (1 hour)
pub const DEFAULT_SANDBOX_TIMEOUT_SECS: u64 = 3600;
/// Environment variables injected into every sandbox
pub const SANDBOX_SECRET_VARS: [&str; 2] = ["GUMCP_CREDENTIALS", "ZAI_API_KEY"];

/// Maximum iterations for the agent loop
pub const DEFAULT_AGENT_MAX_ITERATIONS: usize = 50;
/// Timeout for non-streaming HTTP calls
pub const DEFAULT_LLM_HTTP_TIMEOUT_SECS: u64 = 300;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// ZAI API key
    pub zai_api_key: Option<String>,
    /// guMCP credentials (Gumloop user id)
    pub gumcp_credentials: Option<String>,
    /// E2B API key
    pub e2b_api_key: Option<String>,

    /// Chat model identifier
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Sampling temperature
    #[serde(default = "default_model_temperature")]
    pub model_temperature: f32,
    /// OpenAI-compatible API base
    #[serde(default = "default_model_api_base")]
    pub model_api_base: String,
    /// Maximum output tokens per call
    #[serde(default = "default_model_max_tokens")]
    pub model_max_tokens: u32,

    /// Resources directory
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,
    /// guMCP server base URL
    #[serde(default = "default_gumcp_base_url")]
    pub gumcp_base_url: String,

    /// E2B API URL
    #[serde(default = "default_e2b_api_url")]
    pub e2b_api_url: String,
    /// E2B sandbox domain
    #[serde(default = "default_e2b_domain")]
    pub e2b_domain: String,
    /// Sandbox template id
    #[serde(default = "default_sandbox_template")]
    pub sandbox_template: String,
    /// Sandbox lifetime in seconds
    #[serde(default = "default_sandbox_timeout_secs")]
    pub sandbox_timeout_secs: u64,
    /// Comma-separated pip packages installed before each execution
    pub sandbox_packages: Option<String>,

    /// Agent loop iteration limit
    #[serde(default = "default_agent_max_iterations")]
    pub agent_max_iterations: usize,
    /// HTTP timeout for model and control-plane calls
    #[serde(default = "default_llm_http_timeout_secs")]
    pub llm_http_timeout_secs: u64,
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

const fn default_model_temperature() -> f32 {
    DEFAULT_MODEL_TEMPERATURE
}

fn default_model_api_base() -> String {
    DEFAULT_MODEL_API_BASE.to_string()
}

const fn default_model_max_tokens() -> u32 {
    DEFAULT_MODEL_MAX_TOKENS
}

fn default_resources_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESOURCES_DIR)
}

fn default_gumcp_base_url() -> String {
    DEFAULT_GUMCP_BASE_URL.to_string()
}

fn default_e2b_api_url() -> String {
    DEFAULT_E2B_API_URL.to_string()
}

fn default_e2b_domain() -> String {
    DEFAULT_E2B_DOMAIN.to_string()
}

fn default_sandbox_template() -> String {
    DEFAULT_SANDBOX_TEMPLATE.to_string()
}

const fn default_sandbox_timeout_secs() -> u64 {
    DEFAULT_SANDBOX_TIMEOUT_SECS
}

const fn default_agent_max_iterations() -> usize {
    DEFAULT_AGENT_MAX_ITERATIONS
}

const fn default_llm_http_timeout_secs() -> u64 {
    DEFAULT_LLM_HTTP_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zai_api_key: None,
            gumcp_credentials: None,
            e2b_api_key: None,
            model_name: default_model_name(),
            model_temperature: default_model_temperature(),
            model_api_base: default_model_api_base(),
            model_max_tokens: default_model_max_tokens(),
            resources_dir: default_resources_dir(),
            gumcp_base_url: default_gumcp_base_url(),
            e2b_api_url: default_e2b_api_url(),
            e2b_domain: default_e2b_domain(),
            sandbox_template: default_sandbox_template(),
            sandbox_timeout_secs: default_sandbox_timeout_secs(),
            sandbox_packages: None,
            agent_max_iterations: default_agent_max_iterations(),
            llm_http_timeout_secs: default_llm_http_timeout_secs(),
        }
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gumcp_agent::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Warn about missing credentials.
    ///
    /// Returns `false` when the model key is absent, the agent cannot run
    /// without it. The other credentials only degrade individual features.
    pub fn validate(&self) -> bool {
        if self.zai_api_key.is_none() {
            warn!("ZAI_API_KEY not set");
            return false;
        }
        if self.gumcp_credentials.is_none() {
            warn!("GUMCP_CREDENTIALS not set");
        }
        if self.e2b_api_key.is_none() {
            warn!("E2B_API_KEY not set, code execution will fail");
        }
        true
    }

    /// Directory containing the guMCP documentation files
    #[must_use]
    pub fn gumcp_docs_dir(&self) -> PathBuf {
        self.resources_dir.join("gumcp_docs")
    }

    /// Path of the agent system prompt
    #[must_use]
    pub fn system_prompt_path(&self) -> PathBuf {
        self.resources_dir.join("system_prompt.md")
    }

    /// Path of the integration list consumed by the docs generator
    #[must_use]
    pub fn integrations_list_path(&self) -> PathBuf {
        self.gumcp_docs_dir().join(GUMCP_LIST_FILE)
    }

    /// Packages to install in each sandbox before running code
    #[must_use]
    pub fn sandbox_packages(&self) -> Vec<String> {
        self.sandbox_packages
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Secrets injected into sandboxes, absent values become empty strings
    #[must_use]
    pub fn sandbox_env_vars(&self) -> Vec<(String, String)> {
        let [gumcp, zai] = SANDBOX_SECRET_VARS;
        vec![
            (
                gumcp.to_string(),
                self.gumcp_credentials.clone().unwrap_or_default(),
            ),
            (zai.to_string(), self.zai_api_key.clone().unwrap_or_default()),
        ]
    }
}
