use gumcp_agent::docs::{generate_documentation, parse_integrations, title_case, ToolRecord};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    /// Parsed entries are never blank and never span lines.
    #[test]
    fn parsed_entries_are_single_nonempty_lines(s in "\\PC*(\n\\PC*){0,8}") {
        let entries = parse_integrations(&s);
        prop_assert!(entries.len() <= s.lines().count());
        for entry in entries {
            prop_assert!(!entry.is_empty());
            prop_assert!(!entry.contains('\n'));
        }
    }

    /// Names in a list, with or without the dash prefix, come back in order.
    #[test]
    fn listed_names_are_preserved(
        names in proptest::collection::vec("[a-z][a-z0-9_]{0,15}", 0..10),
        dashed in proptest::bool::ANY,
    ) {
        let text = names
            .iter()
            .map(|n| if dashed { format!("- {n}\n# note\n") } else { format!("  {n}  \n\n") })
            .collect::<String>();
        prop_assert_eq!(parse_integrations(&text), names);
    }

    /// Title casing only changes letter case.
    #[test]
    fn title_case_preserves_letters(s in "[a-zA-Z0-9_ -]*") {
        let titled = title_case(&s);
        prop_assert_eq!(titled.to_lowercase(), s.to_lowercase());
    }

    /// One numbered heading per tool.
    #[test]
    fn one_heading_per_tool(count in 0usize..20) {
        let tools: Vec<ToolRecord> = (0..count)
            .map(|i| ToolRecord {
                name: format!("tool_{i}"),
                description: String::new(),
                parameters: json!({}),
            })
            .collect();
        let doc = generate_documentation(&tools, "x", chrono::NaiveDateTime::default());
        prop_assert_eq!(doc.matches("\n### ").count(), count);
        let total = format!("## Available Tools ({count} total)");
        prop_assert!(doc.contains(&total));
    }
}
