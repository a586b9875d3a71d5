//! Execution results of the code interpreter.
//!
//! The interpreter answers `/execute` with newline-delimited JSON; every line
//! carries a `type` discriminator and is folded into an [`Execution`].

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use super::SandboxError;

/// Captured output streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Logs {
    /// Chunks written to stdout, in order
    pub stdout: Vec<String>,
    /// Chunks written to stderr, in order
    pub stderr: Vec<String>,
}

/// Rich result of an evaluated cell (last expression, displayed objects)
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Plain text representation
    pub text: Option<String>,
    /// Whether this is the value of the cell's last expression
    pub is_main_result: bool,
    /// Names of the additional representations present (png, html, ...)
    pub formats: Vec<String>,
}

/// Exception raised by the executed code
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExecutionError {
    /// Exception class name
    pub name: String,
    /// Exception message
    pub value: String,
    /// Formatted traceback
    #[serde(default)]
    pub traceback: String,
}

/// Complete outcome of one code execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    /// Rich results
    pub results: Vec<ExecutionResult>,
    /// stdout/stderr
    pub logs: Logs,
    /// Exception raised by the code, if any
    pub error: Option<ExecutionError>,
    /// Interpreter execution counter
    pub execution_count: Option<u64>,
    /// Whether the end-of-execution marker was received
    pub finished: bool,
}

#[derive(Deserialize)]
struct TextChunk {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ExecutionCount {
    execution_count: u64,
}

const RESULT_META_KEYS: [&str; 4] = ["type", "text", "is_main_result", "extra"];

impl Execution {
    /// Fold one NDJSON line into the execution. Blank lines are ignored,
    /// unknown message types are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::Protocol` for malformed JSON, a missing type or an
    /// interrupted execution.
    pub fn push_line(&mut self, line: &str) -> Result<(), SandboxError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let value: Value = serde_json::from_str(line)
            .map_err(|e| SandboxError::Protocol(format!("invalid output line: {e}")))?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SandboxError::Protocol("output line without type".to_string()))?
            .to_string();

        match kind.as_str() {
            "stdout" => self.logs.stdout.push(decode::<TextChunk>(value)?.text),
            "stderr" => self.logs.stderr.push(decode::<TextChunk>(value)?.text),
            "error" => self.error = Some(decode::<ExecutionError>(value)?),
            "number_of_executions" => {
                self.execution_count = Some(decode::<ExecutionCount>(value)?.execution_count);
            }
            "result" => self.results.push(parse_result(value)),
            "end_of_execution" => self.finished = true,
            "unexpected_end_of_execution" => {
                return Err(SandboxError::Protocol(
                    "execution ended unexpectedly".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Parse a whole response body
    ///
    /// # Errors
    ///
    /// Propagates the first malformed line.
    pub fn from_ndjson(body: &str) -> Result<Self, SandboxError> {
        let mut execution = Self::default();
        for line in body.lines() {
            execution.push_line(line)?;
        }
        Ok(execution)
    }

    /// Text of the main result, if the cell ended with an expression
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.is_main_result)
            .and_then(|r| r.text.as_deref())
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SandboxError> {
    serde_json::from_value(value).map_err(|e| SandboxError::Protocol(e.to_string()))
}

fn parse_result(value: Value) -> ExecutionResult {
    let object: Map<String, Value> = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let formats = object
        .iter()
        .filter(|(key, v)| !RESULT_META_KEYS.contains(&key.as_str()) && !v.is_null())
        .map(|(key, _)| key.clone())
        .collect();

    ExecutionResult {
        text: object.get("text").and_then(Value::as_str).map(str::to_string),
        is_main_result: object
            .get("is_main_result")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        formats,
    }
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sections = Vec::new();

        if !self.logs.stdout.is_empty() {
            sections.push(format!("Stdout:\n{}", self.logs.stdout.concat().trim_end()));
        }
        if !self.logs.stderr.is_empty() {
            sections.push(format!("Stderr:\n{}", self.logs.stderr.concat().trim_end()));
        }
        for result in &self.results {
            match &result.text {
                Some(text) => sections.push(format!("Result:\n{text}")),
                None if !result.formats.is_empty() => {
                    sections.push(format!("Result: [{}]", result.formats.join(", ")));
                }
                None => {}
            }
        }
        if let Some(err) = &self.error {
            let mut section = format!("Error: {}: {}", err.name, err.value);
            if !err.traceback.is_empty() {
                section.push('\n');
                section.push_str(err.traceback.trim_end());
            }
            sections.push(section);
        }

        if sections.is_empty() {
            write!(f, "Execution completed with no output")
        } else {
            write!(f, "{}", sections.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"{"type":"number_of_executions","execution_count":3}
{"type":"stdout","text":"hello\n","timestamp":1}
{"type":"stdout","text":"world\n","timestamp":2}
{"type":"stderr","text":"warning: x\n","timestamp":3}
{"type":"result","text":"42","is_main_result":true,"png":null}

{"type":"end_of_execution"}
"#;

    #[test]
    fn test_collects_stream() -> Result<(), SandboxError> {
        let execution = Execution::from_ndjson(STREAM)?;
        assert_eq!(execution.logs.stdout, vec!["hello\n", "world\n"]);
        assert_eq!(execution.logs.stderr, vec!["warning: x\n"]);
        assert_eq!(execution.text(), Some("42"));
        assert_eq!(execution.execution_count, Some(3));
        assert!(execution.error.is_none());
        assert!(execution.finished);
        assert_eq!(
            execution.to_string(),
            "Stdout:\nhello\nworld\nStderr:\nwarning: x\nResult:\n42"
        );
        Ok(())
    }

    #[test]
    fn test_error_is_reported_not_raised() -> Result<(), SandboxError> {
        let execution = Execution::from_ndjson(
            r#"{"type":"error","name":"ZeroDivisionError","value":"division by zero","traceback":"Traceback...\n"}
{"type":"end_of_execution"}"#,
        )?;
        let err = execution.error.clone();
        assert_eq!(err.map(|e| e.name), Some("ZeroDivisionError".to_string()));
        assert_eq!(
            execution.to_string(),
            "Error: ZeroDivisionError: division by zero\nTraceback..."
        );
        Ok(())
    }

    #[test]
    fn test_rich_result_without_text_lists_formats() -> Result<(), SandboxError> {
        let execution =
            Execution::from_ndjson(r#"{"type":"result","png":"iVBOR...","is_main_result":false}"#)?;
        assert_eq!(execution.results[0].formats, vec!["png"]);
        assert_eq!(execution.to_string(), "Result: [png]");
        Ok(())
    }

    #[test]
    fn test_unexpected_end_is_protocol_error() {
        let result = Execution::from_ndjson(r#"{"type":"unexpected_end_of_execution"}"#);
        assert!(matches!(result, Err(SandboxError::Protocol(_))));
    }

    #[test]
    fn test_malformed_line_is_protocol_error() {
        assert!(matches!(
            Execution::from_ndjson("not json"),
            Err(SandboxError::Protocol(_))
        ));
        assert!(matches!(
            Execution::from_ndjson(r#"{"text":"no type"}"#),
            Err(SandboxError::Protocol(_))
        ));
    }

    #[test]
    fn test_empty_execution_message() {
        assert_eq!(
            Execution::default().to_string(),
            "Execution completed with no output"
        );
    }
}
