//! LLM providers and client
//!
//! Provides a unified tool-calling interface over the configured chat model.

pub(crate) mod http_utils;
/// Implementations of specific LLM providers
pub mod providers;

pub use http_utils::{create_http_client, send_json_request};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::Settings;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API
    #[error("API error: {0}")]
    ApiError(String),
    /// Error during network communication
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Missing provider configuration or API key
    #[error("Missing client/API key: {0}")]
    MissingConfig(String),
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A message in an LLM conversation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Text content of the message
    pub content: String,
    /// Tool call ID (for tool responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name (for tool responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls made by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    fn with_role(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }

    /// Create a new user message
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::with_role("user", content)
    }

    /// Create a new assistant message
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::with_role("assistant", content)
    }

    /// Create a new assistant message with tool calls
    #[must_use]
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::with_role("assistant", content)
        }
    }

    /// Create a new tool response message keyed by the originating call id
    #[must_use]
    pub fn tool(tool_call_id: &str, name: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            name: Some(name.to_string()),
            ..Self::with_role("tool", content)
        }
    }
}

/// Tool definition for LLM function calling
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for tool parameters
    pub parameters: serde_json::Value,
}

/// Tool call from LLM response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Unique identifier for the tool call
    pub id: String,
    /// Function to be called
    pub function: ToolCallFunction,
}

/// Function details within a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallFunction {
    /// Name of the function being called
    pub name: String,
    /// Arguments for the function call (JSON string)
    pub arguments: String,
}

/// Token usage statistics from API response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    /// Input tokens
    pub prompt_tokens: u32,
    /// Output tokens
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

/// Chat response that may include tool calls
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Optional text content of the response
    pub content: Option<String>,
    /// List of tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// Reason why the model stopped generating
    pub finish_reason: String,
    /// Optional reasoning content (GLM models stream it separately)
    pub reasoning_content: Option<String>,
    /// Token usage statistics (if provided by the API)
    pub usage: Option<TokenUsage>,
}

/// Sampling parameters forwarded to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Model identifier
    pub model_id: String,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Interface for all LLM providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Chat completion with tool calling support
    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &ModelParams,
    ) -> Result<ChatResponse, LlmError>;
}

/// Name under which the ZAI provider is registered
pub const ZAI_PROVIDER: &str = "zai";

/// Client routing model calls to the configured provider
pub struct LlmClient {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    provider_name: String,
    params: ModelParams,
}

impl LlmClient {
    /// Build a client from settings, registering ZAI when its key is present
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut registered: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        if let Some(key) = &settings.zai_api_key {
            registered.insert(
                ZAI_PROVIDER.to_string(),
                Arc::new(providers::ZaiProvider::new(
                    key.clone(),
                    &settings.model_api_base,
                    settings.llm_http_timeout_secs,
                )),
            );
            info!(model = %settings.model_name, "ZAI provider initialized");
        }

        Self {
            providers: registered,
            provider_name: ZAI_PROVIDER.to_string(),
            params: ModelParams {
                model_id: settings.model_name.clone(),
                max_tokens: settings.model_max_tokens,
                temperature: settings.model_temperature,
            },
        }
    }

    /// Register (or replace) a provider and make it the active one
    pub fn register_provider(&mut self, name: String, provider: Arc<dyn LlmProvider>) {
        self.provider_name.clone_from(&name);
        self.providers.insert(name, provider);
    }

    /// Send the conversation with tool definitions to the active provider
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingConfig` if no provider is registered under the
    /// active name, or the provider's error otherwise.
    #[instrument(skip_all, fields(provider = %self.provider_name, messages = messages.len()))]
    pub async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        let provider = self
            .providers
            .get(&self.provider_name)
            .ok_or_else(|| LlmError::MissingConfig(self.provider_name.clone()))?;

        let response = provider
            .chat_with_tools(system_prompt, messages, tools, &self.params)
            .await?;

        debug!(
            tool_calls = response.tool_calls.len(),
            finish_reason = %response.finish_reason,
            "LLM response received"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_answer(text: &str) -> ChatResponse {
        ChatResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            reasoning_content: None,
            usage: None,
        }
    }

    #[tokio::test]
    async fn test_missing_provider_is_config_error() {
        let client = LlmClient::new(&Settings::default());
        let err = client.chat_with_tools("sys", &[], &[]).await;
        assert!(matches!(err, Err(LlmError::MissingConfig(name)) if name == "zai"));
    }

    #[tokio::test]
    async fn test_routes_to_registered_provider_with_settings_params() {
        let settings = Settings {
            model_name: "glm-test".to_string(),
            model_max_tokens: 123,
            ..Settings::default()
        };

        let mut mock = MockLlmProvider::new();
        mock.expect_chat_with_tools()
            .withf(|system, messages, _, params| {
                system == "sys" && messages.len() == 1 && params.model_id == "glm-test"
                    && params.max_tokens == 123
            })
            .times(1)
            .returning(|_, _, _, _| Ok(final_answer("done")));

        let mut client = LlmClient::new(&settings);
        client.register_provider("mock".to_string(), Arc::new(mock));

        let response = client
            .chat_with_tools("sys", &[Message::user("hi")], &[])
            .await;
        assert!(matches!(response, Ok(r) if r.content.as_deref() == Some("done")));
    }

    #[test]
    fn test_tool_message_keyed_by_call_id() {
        let msg = Message::tool("call_1", "python_code_executor", "4");
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.name.as_deref(), Some("python_code_executor"));
    }
}
