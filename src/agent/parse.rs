//! Backend reply parsing
//!
//! The backend answers with either prose to speak or a single JSON action
//! object. Models wrap JSON in markdown fences and pad it with
//! commentary often enough that the extractor takes the span from the
//! first `{` to the last `}` rather than demanding a clean document.

use crate::tools::ActionRequest;
use crate::{Error, Result};

/// A parsed backend reply
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    /// Structured action to dispatch
    Action(ActionRequest),
    /// Prose to speak verbatim
    Speech(String),
}

/// Parse a raw backend reply into speech or an action
///
/// # Errors
///
/// Returns `Error::Parse` if the reply looks structured but does not
/// yield a valid action
pub fn parse_reply(raw: &str) -> Result<AgentReply> {
    let stripped = strip_fences(raw.trim());

    if !looks_structured(&stripped) {
        return Ok(AgentReply::Speech(stripped.to_string()));
    }

    let span = action_span(&stripped)
        .ok_or_else(|| Error::Parse("structured reply with unbalanced braces".to_string()))?;

    let action: ActionRequest = serde_json::from_str(span)
        .map_err(|e| Error::Parse(format!("bad action payload: {e}")))?;

    Ok(AgentReply::Action(action))
}

/// Remove a surrounding markdown code fence if present
fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    // Drop the opening fence line (with any language tag) and a closing fence
    let without_open = trimmed
        .split_once('\n')
        .map_or("", |(_, rest)| rest);

    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
        .to_string()
}

/// Whether a reply should be treated as a structured action
fn looks_structured(text: &str) -> bool {
    text.starts_with('{') || text.contains("\"tool\"")
}

/// Extract the first-`{`-to-last-`}` span
fn action_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_is_speech() {
        let reply = parse_reply("The weather looks fine today.").unwrap();
        assert_eq!(
            reply,
            AgentReply::Speech("The weather looks fine today.".to_string())
        );
    }

    #[test]
    fn bare_json_is_an_action() {
        let reply = parse_reply(r#"{"tool": "open_app", "name": "Firefox"}"#).unwrap();
        assert_eq!(
            reply,
            AgentReply::Action(ActionRequest::OpenApp {
                name: "Firefox".to_string()
            })
        );
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let raw = "```json\n{\"tool\": \"query_time\"}\n```";
        let reply = parse_reply(raw).unwrap();
        assert_eq!(reply, AgentReply::Action(ActionRequest::QueryTime));
    }

    #[test]
    fn json_with_commentary_is_extracted() {
        let raw = "Sure, I'll run that.\n{\"tool\": \"run_command\", \"command\": \"uptime\"}\nLet me know.";
        let reply = parse_reply(raw).unwrap();
        assert_eq!(
            reply,
            AgentReply::Action(ActionRequest::RunCommand {
                command: "uptime".to_string()
            })
        );
    }

    #[test]
    fn unbalanced_braces_are_a_parse_error() {
        let raw = r#"{"tool": "run_command", "command": "ls"#;
        assert!(matches!(parse_reply(raw), Err(Error::Parse(_))));
    }

    #[test]
    fn tool_marker_without_valid_json_is_a_parse_error() {
        let raw = r#"I would use the "tool" called hammer { maybe"#;
        assert!(matches!(parse_reply(raw), Err(Error::Parse(_))));
    }

    #[test]
    fn unknown_tool_is_a_parse_error() {
        let raw = r#"{"tool": "launch_missiles"}"#;
        assert!(matches!(parse_reply(raw), Err(Error::Parse(_))));
    }

    #[test]
    fn prose_mentioning_braces_without_tool_marker_is_speech() {
        let reply = parse_reply("Use curly braces, like this: } or {.").unwrap();
        assert!(matches!(reply, AgentReply::Speech(_)));
    }
}
