//! Destructive-action gating and confirmation answers
//!
//! Pure pattern checks; the agent loop owns the pending state and the
//! decision to defer execution.

use crate::tools::ActionRequest;

/// Substrings that mark a shell command as destructive
const DESTRUCTIVE_PATTERNS: &[&str] = &[
    "rm ",
    "del ",
    "rmdir",
    "remove",
    "delete",
    "format",
    "fdisk",
    "drop ",
    "truncate",
    "shutdown",
    "restart",
    "reboot",
    "> ",
    ">>",
    "git push --force",
    "git reset --hard",
];

/// Words that count as an affirmative confirmation answer
const AFFIRMATIVES: &[&str] = &["yes", "proceed", "confirm", "go"];

/// The free-form payload an action would feed to the shell, if any
///
/// Only `run_command` carries one; every other action is a fixed-shape
/// side effect that needs no confirmation.
#[must_use]
pub fn destructive_payload(action: &ActionRequest) -> Option<&str> {
    match action {
        ActionRequest::RunCommand { command } => {
            is_destructive(command).then_some(command.as_str())
        }
        _ => None,
    }
}

/// Whether a shell command matches the destructive pattern list
#[must_use]
pub fn is_destructive(command: &str) -> bool {
    let lowered = command.to_lowercase();
    DESTRUCTIVE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// The question spoken before a destructive command runs
#[must_use]
pub fn confirmation_question(command: &str) -> String {
    format!("This may be destructive: {command}. Proceed, yes or no?")
}

/// Whether a confirmation answer is affirmative
///
/// Matches whole words only; "go" must not fire inside "google". The
/// two-word form "do it" is accepted as well. Anything non-affirmative
/// is a rejection.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    let lowered = answer.trim().to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|word| AFFIRMATIVES.contains(word)) {
        return true;
    }

    words.windows(2).any(|pair| pair == ["do", "it"])
}
