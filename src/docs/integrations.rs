//! Integration list parsing

use std::path::Path;

use super::DocsError;

/// Parse the integrations list: one name per line, `#` comments and blank
/// lines ignored, an optional leading `- ` stripped.
#[must_use]
pub fn parse_integrations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.strip_prefix("- ").unwrap_or(line).to_string())
        .collect()
}

/// Read and parse the integrations list at `path`.
///
/// # Errors
///
/// Returns `DocsError::ListNotFound` if the file does not exist, or
/// `DocsError::Io` for any other read failure.
pub async fn read_integrations_list(path: &Path) -> Result<Vec<String>, DocsError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(parse_integrations(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocsError::ListNotFound(path.to_path_buf()))
        }
        Err(e) => Err(DocsError::Io(e)),
    }
}

/// Title-case a name the way document headings expect: the first letter of
/// every alphabetic run is uppercased, the rest lowercased.
#[must_use]
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
