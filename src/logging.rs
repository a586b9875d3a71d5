//! Tracing setup with secret redaction
//!
//! Every line written by the fmt layer passes through [`RedactionPatterns`],
//! so API keys and the guMCP user id never reach the terminal.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    bearer: Regex,
    api_key_header: Regex,
    access_token_header: Regex,
    gumcp_url: Regex,
    env_assignment: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bearer: Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._\-]+")?,
            api_key_header: Regex::new(r#"(?i)(x-api-key["':=\s]+)[A-Za-z0-9._\-]+"#)?,
            access_token_header: Regex::new(r#"(?i)(x-access-token["':=\s]+)[A-Za-z0-9._\-]+"#)?,
            // `<base>/<integration>/<user id>/mcp` on any host
            gumcp_url: Regex::new(r"(https?://[^/\s]+(?:/[^/\s]+)*?/[A-Za-z0-9_.\-]+/)[^/\s]+(/mcp\b)")?,
            env_assignment: Regex::new(
                r"(ZAI_API_KEY|GUMCP_CREDENTIALS|E2B_API_KEY)=[^\s&]+",
            )?,
        })
    }

    /// Mask every known secret in `input`
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = self
            .bearer
            .replace_all(input, "${1}[MASKED]")
            .to_string();
        output = self
            .api_key_header
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .access_token_header
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .gumcp_url
            .replace_all(&output, "${1}[GUMCP_CREDENTIALS]${2}")
            .to_string();
        output = self
            .env_assignment
            .replace_all(&output, "${1}=[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length, the caller wrote all of `buf`
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`),
/// redacted output on stderr.
///
/// # Errors
///
/// Returns an error if the redaction patterns fail to compile.
pub fn init_logging() -> Result<(), regex::Error> {
    let patterns = Arc::new(RedactionPatterns::new()?);
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> RedactionPatterns {
        match RedactionPatterns::new() {
            Ok(p) => p,
            Err(e) => panic!("patterns must compile: {e}"),
        }
    }

    #[test]
    fn test_masks_bearer_and_headers() {
        let p = patterns();
        let out = p.redact("Authorization: Bearer sk-abc.DEF_123 X-API-Key: e2b_999");
        assert!(!out.contains("sk-abc.DEF_123"));
        assert!(!out.contains("e2b_999"));
        assert!(out.contains("Bearer [MASKED]"));
    }

    #[test]
    fn test_masks_gumcp_user_in_url() {
        let p = patterns();
        let out = p.redact("connecting to https://mcp.gumloop.com/gmail/user-42/mcp now");
        assert_eq!(
            out,
            "connecting to https://mcp.gumloop.com/gmail/[GUMCP_CREDENTIALS]/mcp now"
        );
    }

    #[test]
    fn test_masks_gumcp_user_on_custom_base_url() {
        let p = patterns();
        let out = p.redact("GUMCP_BASE_URL override: http://localhost:8000/slack/abc:def/mcp");
        assert_eq!(
            out,
            "GUMCP_BASE_URL override: http://localhost:8000/slack/[GUMCP_CREDENTIALS]/mcp"
        );

        let out = p.redact("url=https://proxy.internal/gumcp/gmail/user-7/mcp/");
        assert_eq!(out, "url=https://proxy.internal/gumcp/gmail/[GUMCP_CREDENTIALS]/mcp/");
    }

    #[test]
    fn test_masks_env_assignments() {
        let p = patterns();
        let out = p.redact("env ZAI_API_KEY=secret E2B_API_KEY=other");
        assert_eq!(out, "env ZAI_API_KEY=[MASKED] E2B_API_KEY=[MASKED]");
    }

    #[test]
    fn test_plain_text_untouched() {
        let p = patterns();
        let line = "Loaded 3 guMCP documentation files";
        assert_eq!(p.redact(line), line);
    }

    #[test]
    fn test_writer_reports_original_length() -> io::Result<()> {
        let mut sink = Vec::new();
        {
            let mut writer = RedactingWriter::new(&mut sink, Arc::new(patterns()));
            let written = writer.write(b"Bearer token123")?;
            assert_eq!(written, 15);
        }
        assert_eq!(String::from_utf8_lossy(&sink), "Bearer [MASKED]");
        Ok(())
    }
}
