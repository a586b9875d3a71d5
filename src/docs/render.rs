//! Markdown rendering of discovered tools

use std::fmt::Write;

use chrono::NaiveDateTime;

use super::catalog::ToolRecord;
use super::integrations::title_case;

/// Timestamp format of the "Generated on" line
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the documentation page for `integration`
#[must_use]
pub fn generate_documentation(
    tools: &[ToolRecord],
    integration: &str,
    generated_at: NaiveDateTime,
) -> String {
    let mut doc = format!(
        "# {} guMCP Tools Documentation\n\n*Generated on: {}*\n\n## Available Tools ({} total)\n\n",
        title_case(integration),
        generated_at.format(GENERATED_AT_FORMAT),
        tools.len()
    );

    for (i, tool) in tools.iter().enumerate() {
        let schema = serde_json::to_string_pretty(&tool.parameters)
            .unwrap_or_else(|_| tool.parameters.to_string());
        // Writing to a String cannot fail
        let _ = write!(
            doc,
            "### {}. {}\n- **Description**: {}\n- **Parameters Schema**:\n```json\n{schema}\n```\n\n",
            i + 1,
            tool.name,
            tool.description
        );
    }

    doc
}
