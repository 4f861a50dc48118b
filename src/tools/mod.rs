//! Desktop tooling the agent can drive
//!
//! [`ActionRequest`] is the closed schema of everything the language
//! backend may ask for; the submodules carry the actual platform work.
//! Dispatch lives with the agent loop, which is the only place that can
//! weigh confirmation and memory policy before anything runs.

pub mod files;
mod music;
pub mod screen;
pub mod shell;
pub mod system;

pub use music::MusicPlayer;

use serde::Deserialize;

/// A structured action parsed from the language backend's reply
///
/// Tagged by `tool`; unknown tools fail deserialization rather than
/// falling through to some default behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ActionRequest {
    OpenApp {
        name: String,
    },
    OpenUrl {
        url: String,
    },
    WebSearch {
        query: String,
    },
    MediaControl {
        action: MediaAction,
    },
    ReadFile {
        path: String,
    },
    WriteFile {
        path: String,
        content: String,
    },
    ListDirectory {
        path: String,
    },
    RunCommand {
        command: String,
    },
    QueryTime,
    QueryClipboard,
    TypeText {
        text: String,
    },
    PressKey {
        key: String,
    },
    PlayMusic {
        query: String,
    },
    StopMusic,
    AnalyzeScreen {
        #[serde(default)]
        question: String,
    },
    LoadProject {
        path: String,
    },
    UpdateProject {
        action: ProjectAction,
        #[serde(default)]
        text: String,
    },
    Exit,
}

impl ActionRequest {
    /// Wire name of the action, for logs and the journal
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenApp { .. } => "open_app",
            Self::OpenUrl { .. } => "open_url",
            Self::WebSearch { .. } => "web_search",
            Self::MediaControl { .. } => "media_control",
            Self::ReadFile { .. } => "read_file",
            Self::WriteFile { .. } => "write_file",
            Self::ListDirectory { .. } => "list_directory",
            Self::RunCommand { .. } => "run_command",
            Self::QueryTime => "query_time",
            Self::QueryClipboard => "query_clipboard",
            Self::TypeText { .. } => "type_text",
            Self::PressKey { .. } => "press_key",
            Self::PlayMusic { .. } => "play_music",
            Self::StopMusic => "stop_music",
            Self::AnalyzeScreen { .. } => "analyze_screen",
            Self::LoadProject { .. } => "load_project",
            Self::UpdateProject { .. } => "update_project",
            Self::Exit => "exit",
        }
    }
}

/// Media transport verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    PlayPause,
    Next,
    Previous,
}

/// Project ledger mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAction {
    AddTask,
    CompleteTask,
    SetBlocker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_parses() {
        let action: ActionRequest =
            serde_json::from_str(r#"{"tool": "run_command", "command": "ls -la"}"#).unwrap();
        assert_eq!(
            action,
            ActionRequest::RunCommand {
                command: "ls -la".to_string()
            }
        );
    }

    #[test]
    fn unit_actions_parse_from_tag_alone() {
        let action: ActionRequest = serde_json::from_str(r#"{"tool": "query_time"}"#).unwrap();
        assert_eq!(action, ActionRequest::QueryTime);

        let action: ActionRequest = serde_json::from_str(r#"{"tool": "exit"}"#).unwrap();
        assert_eq!(action, ActionRequest::Exit);
    }

    #[test]
    fn unknown_tools_are_rejected() {
        let result: Result<ActionRequest, _> =
            serde_json::from_str(r#"{"tool": "format_disk", "target": "/dev/sda"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn media_and_project_verbs_parse() {
        let action: ActionRequest =
            serde_json::from_str(r#"{"tool": "media_control", "action": "play_pause"}"#).unwrap();
        assert_eq!(
            action,
            ActionRequest::MediaControl {
                action: MediaAction::PlayPause
            }
        );

        let action: ActionRequest = serde_json::from_str(
            r#"{"tool": "update_project", "action": "add_task", "text": "ship it"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            ActionRequest::UpdateProject {
                action: ProjectAction::AddTask,
                text: "ship it".to_string()
            }
        );
    }

    #[test]
    fn missing_question_defaults_empty() {
        let action: ActionRequest = serde_json::from_str(r#"{"tool": "analyze_screen"}"#).unwrap();
        assert_eq!(
            action,
            ActionRequest::AnalyzeScreen {
                question: String::new()
            }
        );
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let action: ActionRequest = serde_json::from_str(
            r#"{"tool": "open_app", "name": "Firefox", "reasoning": "user asked"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            ActionRequest::OpenApp {
                name: "Firefox".to_string()
            }
        );
    }

    #[test]
    fn action_names_match_wire_tags() {
        assert_eq!(ActionRequest::QueryTime.name(), "query_time");
        assert_eq!(
            ActionRequest::RunCommand {
                command: String::new()
            }
            .name(),
            "run_command"
        );
    }
}
