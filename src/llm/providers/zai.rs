//! ZAI (GLM) provider over the OpenAI-compatible chat completions API.
//!
//! Parsing is lenient: GLM responses may omit the `type` field of tool calls
//! and occasionally the call id, which strict OpenAI clients reject.

use crate::llm::http_utils::{create_http_client, send_json_request};
use crate::llm::{
    ChatResponse, LlmError, LlmProvider, Message, ModelParams, TokenUsage, ToolCall,
    ToolCallFunction, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
struct LenientToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct LenientToolCall {
    id: Option<String>,
    function: LenientToolCallFunction,
}

#[derive(Deserialize, Debug)]
struct LenientMessage {
    content: Option<String>,
    reasoning_content: Option<String>,
    tool_calls: Option<Vec<LenientToolCall>>,
}

#[derive(Deserialize, Debug)]
struct LenientChoice {
    message: LenientMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LenientResponse {
    choices: Vec<LenientChoice>,
    usage: Option<TokenUsage>,
}

/// LLM provider implementation for ZAI
pub struct ZaiProvider {
    http_client: HttpClient,
    api_key: String,
    url: String,
}

impl ZaiProvider {
    /// Create a new ZAI provider instance
    #[must_use]
    pub fn new(api_key: String, api_base: &str, timeout_secs: u64) -> Self {
        Self {
            http_client: create_http_client(timeout_secs),
            api_key,
            url: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        }
    }

    fn prepare_messages(system_prompt: &str, history: &[Message]) -> Vec<Value> {
        let mut messages = vec![json!({
            "role": "system",
            "content": system_prompt
        })];

        for msg in history {
            match msg.role.as_str() {
                "tool" => {
                    messages.push(json!({
                        "role": "tool",
                        "tool_call_id": msg.tool_call_id,
                        "content": msg.content
                    }));
                }
                "assistant" => {
                    let mut m = json!({
                        "role": "assistant",
                        "content": msg.content
                    });

                    if let Some(tool_calls) = &msg.tool_calls {
                        let api_tool_calls: Vec<Value> = tool_calls
                            .iter()
                            .map(|tc| {
                                json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.function.name,
                                        "arguments": tc.function.arguments
                                    }
                                })
                            })
                            .collect();

                        m["tool_calls"] = json!(api_tool_calls);
                    }

                    messages.push(m);
                }
                _ => {
                    messages.push(json!({
                        "role": msg.role,
                        "content": msg.content
                    }));
                }
            }
        }
        messages
    }

    fn build_body(
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolDefinition],
        params: &ModelParams,
    ) -> Value {
        let mut body = json!({
            "model": params.model_id,
            "messages": Self::prepare_messages(system_prompt, history),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature
        });

        if !tools.is_empty() {
            let openai_tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters
                        }
                    })
                })
                .collect();
            body["tools"] = json!(openai_tools);
        }
        body
    }

    fn parse_response(res_json: LenientResponse) -> Result<ChatResponse, LlmError> {
        let choice = res_json
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ApiError("Empty response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                function: ToolCallFunction {
                    name: tc.function.name,
                    arguments: arguments_to_string(tc.function.arguments),
                },
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice
                .finish_reason
                .unwrap_or_else(|| "unknown".to_string()),
            reasoning_content: choice.message.reasoning_content,
            usage: res_json.usage,
        })
    }
}

/// Arguments arrive as a JSON string per the OpenAI schema, but some
/// gateways send the object itself.
fn arguments_to_string(arguments: Option<Value>) -> String {
    match arguments {
        None | Some(Value::Null) => "{}".to_string(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl LlmProvider for ZaiProvider {
    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &ModelParams,
    ) -> Result<ChatResponse, LlmError> {
        let body = Self::build_body(system_prompt, messages, tools, params);
        debug!(model = %params.model_id, tools = tools.len(), "Sending ZAI chat request");

        let auth_header = format!("Bearer {}", self.api_key);
        let response =
            send_json_request(&self.http_client, &self.url, &body, Some(&auth_header), &[])
                .await?;

        let parsed: LenientResponse =
            serde_json::from_value(response).map_err(|e| LlmError::JsonError(e.to_string()))?;
        Self::parse_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Value) -> Result<ChatResponse, LlmError> {
        let parsed: LenientResponse =
            serde_json::from_value(value).map_err(|e| LlmError::JsonError(e.to_string()))?;
        ZaiProvider::parse_response(parsed)
    }

    #[test]
    fn test_parses_tool_calls_without_type_or_id() -> Result<(), LlmError> {
        let response = parse(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "reasoning_content": "need to run code",
                    "tool_calls": [
                        {"function": {"name": "python_code_executor", "arguments": "{\"code\":\"print(1)\"}"}},
                        {"id": "call_b", "function": {"name": "ls", "arguments": {}}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))?;

        assert_eq!(response.tool_calls.len(), 2);
        assert!(response.tool_calls[0].id.starts_with("call_"));
        assert_eq!(response.tool_calls[0].function.arguments, "{\"code\":\"print(1)\"}");
        assert_eq!(response.tool_calls[1].id, "call_b");
        assert_eq!(response.tool_calls[1].function.arguments, "{}");
        assert_eq!(response.reasoning_content.as_deref(), Some("need to run code"));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
        Ok(())
    }

    #[test]
    fn test_empty_choices_is_api_error() {
        let result = parse(json!({"choices": []}));
        assert!(matches!(result, Err(LlmError::ApiError(_))));
    }

    #[test]
    fn test_body_includes_tool_history() {
        let call = ToolCall {
            id: "call_1".to_string(),
            function: ToolCallFunction {
                name: "ls".to_string(),
                arguments: "{}".to_string(),
            },
        };
        let history = vec![
            Message::user("list files"),
            Message::assistant_with_tools("", vec![call]),
            Message::tool("call_1", "ls", "a.txt"),
        ];
        let params = ModelParams {
            model_id: "glm-4.6".to_string(),
            max_tokens: 100,
            temperature: 0.6,
        };

        let body = ZaiProvider::build_body("sys", &history, &[], &params);
        let messages = body["messages"].as_array().cloned().unwrap_or_default();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["tool_calls"][0]["type"], "function");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_url_joins_base_without_double_slash() {
        let provider = ZaiProvider::new("k".to_string(), "https://api.z.ai/api/coding/paas/v4/", 5);
        assert_eq!(provider.url, "https://api.z.ai/api/coding/paas/v4/chat/completions");
    }
}
