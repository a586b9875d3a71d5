//! E2B code interpreter backend.
//!
//! Lifecycle goes through the control plane REST API, code runs through the
//! interpreter exposed on port 49999 of the sandbox.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{Execution, SandboxBackend, SandboxError, SandboxHandle, SandboxRequest};
use crate::config::Settings;
use crate::llm::http_utils::{clean_error_body, create_http_client};

const INTERPRETER_PORT: u16 = 49999;

#[derive(Deserialize, Debug)]
struct CreatedSandbox {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "envdAccessToken")]
    envd_access_token: Option<String>,
}

/// Sandbox backend talking to E2B
pub struct E2bBackend {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    domain: String,
    exec_timeout: Duration,
}

impl E2bBackend {
    /// Create the backend. A missing API key only fails when a sandbox is
    /// requested.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            http_client: create_http_client(settings.llm_http_timeout_secs),
            api_key: settings.e2b_api_key.clone(),
            api_url: settings.e2b_api_url.trim_end_matches('/').to_string(),
            domain: settings.e2b_domain.clone(),
            exec_timeout: Duration::from_secs(settings.sandbox_timeout_secs),
        }
    }

    fn api_key(&self) -> Result<&str, SandboxError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SandboxError::MissingConfig("E2B_API_KEY".to_string()))
    }

    fn execute_url(&self, sandbox_id: &str) -> String {
        format!("https://{INTERPRETER_PORT}-{sandbox_id}.{}/execute", self.domain)
    }

    async fn error_from(response: reqwest::Response) -> SandboxError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        SandboxError::Api(clean_error_body(status, &body))
    }
}

/// Fold a chunked NDJSON body into an execution.
///
/// Lines are reassembled from raw bytes before decoding, so chunk boundaries
/// may fall anywhere, including inside a multi-byte character. A final line
/// without a trailing newline is still processed.
async fn collect_execution<S, B, E>(mut stream: S) -> Result<Execution, SandboxError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut execution = Execution::default();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| SandboxError::Network(e.to_string()))?;
        buffer.extend_from_slice(chunk.as_ref());
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            execution.push_line(&String::from_utf8_lossy(&line))?;
        }
    }
    execution.push_line(&String::from_utf8_lossy(&buffer))?;
    Ok(execution)
}

#[async_trait]
impl SandboxBackend for E2bBackend {
    #[instrument(skip_all, fields(template = %request.template))]
    async fn create(&self, request: &SandboxRequest) -> Result<SandboxHandle, SandboxError> {
        let env_vars: HashMap<&str, &str> = request
            .env_vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let body = json!({
            "templateID": request.template,
            "timeout": request.timeout_secs,
            "envVars": env_vars,
            "metadata": {}
        });

        let response = self
            .http_client
            .post(format!("{}/sandboxes", self.api_url))
            .header("X-API-Key", self.api_key()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let created: CreatedSandbox = response
            .json()
            .await
            .map_err(|e| SandboxError::Protocol(e.to_string()))?;

        Ok(SandboxHandle {
            sandbox_id: created.sandbox_id,
            access_token: created.envd_access_token,
        })
    }

    #[instrument(skip_all, fields(sandbox_id = %handle.sandbox_id))]
    async fn run_code(
        &self,
        handle: &SandboxHandle,
        code: &str,
    ) -> Result<Execution, SandboxError> {
        let mut request = self
            .http_client
            .post(self.execute_url(&handle.sandbox_id))
            .timeout(self.exec_timeout)
            .json(&json!({ "code": code, "language": "python" }));
        if let Some(token) = &handle.access_token {
            request = request.header("X-Access-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let execution = collect_execution(response.bytes_stream()).await?;
        if !execution.finished {
            debug!("Execution stream closed without end marker");
        }
        Ok(execution)
    }

    #[instrument(skip_all, fields(sandbox_id = %handle.sandbox_id))]
    async fn kill(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let response = self
            .http_client
            .delete(format!("{}/sandboxes/{}", self.api_url, handle.sandbox_id))
            .header("X-API-Key", self.api_key()?)
            .send()
            .await
            .map_err(|e| SandboxError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("Sandbox already gone");
                Ok(())
            }
            _ => Err(Self::error_from(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_url_uses_interpreter_port() {
        let backend = E2bBackend::new(&Settings::default());
        assert_eq!(
            backend.execute_url("abc123"),
            "https://49999-abc123.e2b.app/execute"
        );
    }

    #[tokio::test]
    async fn test_create_without_key_is_config_error() {
        let backend = E2bBackend::new(&Settings::default());
        let request = SandboxRequest {
            template: "code-interpreter-v1".to_string(),
            timeout_secs: 3600,
            env_vars: vec![],
        };
        let result = backend.create(&request).await;
        assert!(matches!(result, Err(SandboxError::MissingConfig(key)) if key == "E2B_API_KEY"));
    }

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Unpin {
        futures_util::stream::iter(parts.iter().map(|p| Ok(p.to_vec())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() -> Result<(), SandboxError> {
        let execution = collect_execution(chunks(&[
            br#"{"type":"stdout","te"#,
            b"xt\":\"hello\\n\"}\n{\"type\":\"end_of_execution\"}\n",
        ]))
        .await?;
        assert_eq!(execution.logs.stdout, vec!["hello\n".to_string()]);
        assert!(execution.finished);
        Ok(())
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() -> Result<(), SandboxError> {
        let line = "{\"type\":\"stdout\",\"text\":\"h\u{e9}llo\"}\n".as_bytes();
        let cut = line.iter().position(|b| *b == 0xC3).map_or(0, |i| i + 1);
        let (head, tail) = line.split_at(cut);

        let execution = collect_execution(chunks(&[head, tail])).await?;
        assert_eq!(execution.logs.stdout, vec!["h\u{e9}llo".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_final_line_without_newline() -> Result<(), SandboxError> {
        let execution = collect_execution(chunks(&[
            b"{\"type\":\"stderr\",\"text\":\"warn\"}\n",
            br#"{"type":"number_of_executions","execution_count":3}"#,
        ]))
        .await?;
        assert_eq!(execution.logs.stderr, vec!["warn".to_string()]);
        assert_eq!(execution.execution_count, Some(3));
        assert!(!execution.finished);
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_error_is_network_error() {
        let stream = futures_util::stream::iter(vec![
            Ok(b"{\"type\":\"stdout\",\"text\":\"a\"}\n".to_vec()),
            Err(std::io::Error::other("reset")),
        ]);
        let result = collect_execution(stream).await;
        assert!(matches!(result, Err(SandboxError::Network(msg)) if msg == "reset"));
    }

    #[test]
    fn test_created_sandbox_parsing() -> Result<(), serde_json::Error> {
        let created: CreatedSandbox = serde_json::from_str(
            r#"{"templateID":"code-interpreter-v1","sandboxID":"i1x2","clientID":"c","envdVersion":"0.2.0","envdAccessToken":"tok"}"#,
        )?;
        assert_eq!(created.sandbox_id, "i1x2");
        assert_eq!(created.envd_access_token.as_deref(), Some("tok"));
        Ok(())
    }
}
