use crate::errors::ToolError;
use crate::utils::suggest::suggest;

/// Error for a tool name that reached a manager which does not serve it.
pub fn unknown_tool_error(manager: &str, tool: &str, known_tools: &[&str]) -> ToolError {
    let known: Vec<String> = known_tools.iter().map(|s| s.to_string()).collect();
    let suggestions = if tool.is_empty() {
        Vec::new()
    } else {
        suggest(tool, &known, 5)
    };
    let list_hint = if known.is_empty() {
        String::new()
    } else {
        format!("Use one of: {}.", known.join(", "))
    };
    let did_you_mean = if suggestions.is_empty() {
        String::new()
    } else {
        format!("Did you mean: {}?", suggestions.join(", "))
    };
    let hint = [did_you_mean, list_hint]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut err = ToolError::invalid_params(format!("Unknown {} tool: {}", manager, tool));
    if !hint.is_empty() {
        err = err.with_hint(hint);
    }
    if !known.is_empty() {
        err = err.with_details(serde_json::json!({
            "known_tools": known,
            "did_you_mean": suggestions,
        }));
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_the_closest_known_tool() {
        let err = unknown_tool_error(
            "jira",
            "jira_get_tickt",
            &["jira_get_ticket", "jira_manage_labels"],
        );
        assert_eq!(err.message, "Unknown jira tool: jira_get_tickt");
        assert!(err
            .hint
            .expect("hint")
            .starts_with("Did you mean: jira_get_ticket?"));
    }
}
