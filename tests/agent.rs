//! Agent core integration tests
//!
//! Drives the reply-handling path directly so no language backend is
//! needed: structured replies dispatch tools, destructive commands park
//! behind a confirmation, and malformed replies fall back to a fixed
//! response.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use valet::agent::{AgentCore, CANCELLED_REPLY, CONFUSED_REPLY};
use valet::memory::Journal;
use valet::tools::MusicPlayer;
use valet::{MemoryStore, Outcome};

mod common;

fn agent_in(dir: &TempDir) -> (AgentCore, MemoryStore) {
    let store = common::setup_test_store();
    let journal = Journal::new(dir.path());
    let music = Arc::new(MusicPlayer::new());
    let config = common::test_config(dir.path());

    let agent = AgentCore::new(&config, store.clone(), journal, music)
        .expect("agent should construct with a key present");
    (agent, store)
}

#[tokio::test]
async fn test_plain_speech_reply_is_spoken_verbatim() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let outcome = agent
        .handle_reply("how are you", "Doing great, thanks for asking.")
        .await;

    assert_eq!(
        outcome,
        Outcome::Spoken("Doing great, thanks for asking.".to_string())
    );
}

#[tokio::test]
async fn test_structured_reply_dispatches_the_tool() {
    let dir = TempDir::new().unwrap();
    let (mut agent, store) = agent_in(&dir);

    let note = dir.path().join("note.txt");
    let reply = json!({
        "tool": "write_file",
        "path": note.display().to_string(),
        "content": "hello",
    })
    .to_string();

    let outcome = agent.handle_reply("write a note", &reply).await;

    let Outcome::ActionExecuted(ack) = outcome else {
        panic!("expected an executed action, got {outcome:?}");
    };
    assert!(ack.starts_with("Wrote 5 characters"), "ack was: {ack}");
    assert_eq!(std::fs::read_to_string(&note).unwrap(), "hello");

    // The exchange is recorded in long-term memory
    assert!(store.count().unwrap() >= 1);
}

#[tokio::test]
async fn test_fenced_reply_with_commentary_still_executes() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let note = dir.path().join("fenced.txt");
    let action = json!({
        "tool": "write_file",
        "path": note.display().to_string(),
        "content": "ok",
    });
    let reply = format!("Sure thing!\n```json\n{action}\n```");

    let outcome = agent.handle_reply("write it down", &reply).await;

    assert!(matches!(outcome, Outcome::ActionExecuted(_)), "got {outcome:?}");
    assert!(note.exists());
}

#[tokio::test]
async fn test_malformed_structured_reply_is_never_spoken_raw() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let reply = r#"{"tool": "write_file", "path": "/tmp/x""#;
    let outcome = agent.handle_reply("write something", reply).await;

    assert_eq!(outcome, Outcome::Spoken(CONFUSED_REPLY.to_string()));
}

#[tokio::test]
async fn test_unknown_tool_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let reply = r#"{"tool": "launch_missiles", "target": "moon"}"#;
    let outcome = agent.handle_reply("do something", reply).await;

    assert_eq!(outcome, Outcome::Spoken(CONFUSED_REPLY.to_string()));
}

#[tokio::test]
async fn test_destructive_command_waits_for_confirmation() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let victim = dir.path().join("victim.txt");
    std::fs::write(&victim, "data").unwrap();

    let reply = json!({
        "tool": "run_command",
        "command": format!("rm {}", victim.display()),
    })
    .to_string();

    let outcome = agent.handle_reply("clean up that file", &reply).await;

    let Outcome::Spoken(question) = outcome else {
        panic!("expected a confirmation question, got {outcome:?}");
    };
    assert!(question.starts_with("This may be destructive"), "got: {question}");
    assert!(question.ends_with("Proceed, yes or no?"), "got: {question}");

    // Nothing ran yet
    assert!(victim.exists());
}

#[tokio::test]
async fn test_confirmed_destructive_command_runs_exactly_once() {
    let dir = TempDir::new().unwrap();
    let (mut agent, store) = agent_in(&dir);

    let victim = dir.path().join("victim.txt");
    std::fs::write(&victim, "data").unwrap();

    let reply = json!({
        "tool": "run_command",
        "command": format!("rm {}", victim.display()),
    })
    .to_string();

    agent.handle_reply("remove it", &reply).await;
    assert!(victim.exists());

    // The affirmative answer resolves the pending action without any
    // backend round trip
    let outcome = agent.handle("yes").await;

    let Outcome::ActionExecuted(text) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert!(text.starts_with("Done."), "got: {text}");
    assert!(!victim.exists());

    // Both the question and the resolution were recorded
    assert!(store.count().unwrap() >= 2);
}

#[tokio::test]
async fn test_rejected_confirmation_cancels_the_action() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let victim = dir.path().join("victim.txt");
    std::fs::write(&victim, "data").unwrap();

    let reply = json!({
        "tool": "run_command",
        "command": format!("rm {}", victim.display()),
    })
    .to_string();

    agent.handle_reply("remove it", &reply).await;

    let outcome = agent.handle("no, leave it alone").await;
    assert_eq!(outcome, Outcome::Spoken(CANCELLED_REPLY.to_string()));
    assert!(victim.exists());
}

#[tokio::test]
async fn test_ambiguous_answer_counts_as_rejection() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let victim = dir.path().join("victim.txt");
    std::fs::write(&victim, "data").unwrap();

    let reply = json!({
        "tool": "run_command",
        "command": format!("rm {}", victim.display()),
    })
    .to_string();

    agent.handle_reply("remove it", &reply).await;

    // "go ahead" is affirmative; "I don't know, maybe?" is not
    let outcome = agent.handle("I don't know, maybe?").await;
    assert_eq!(outcome, Outcome::Spoken(CANCELLED_REPLY.to_string()));
    assert!(victim.exists());
}

#[tokio::test]
async fn test_harmless_command_runs_without_confirmation() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let reply = r#"{"tool": "run_command", "command": "echo hi"}"#;
    let outcome = agent.handle_reply("say hi in the shell", reply).await;

    let Outcome::ActionExecuted(text) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert_eq!(text, "hi");
}

#[tokio::test]
async fn test_exit_action_produces_a_farewell() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let outcome = agent.handle_reply("shut down", r#"{"tool": "exit"}"#).await;

    let Outcome::Exit(farewell) = outcome else {
        panic!("expected an exit outcome, got {outcome:?}");
    };
    assert!(farewell.contains("Goodbye"));
}

#[tokio::test]
async fn test_query_time_answers_locally() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let outcome = agent.handle_reply("what time is it", r#"{"tool": "query_time"}"#).await;

    let Outcome::ActionExecuted(text) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert!(text.starts_with("It's "));
}

#[tokio::test]
async fn test_project_update_without_a_loaded_project() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let reply = r#"{"tool": "update_project", "action": "add_task", "text": "ship it"}"#;
    let outcome = agent.handle_reply("add a task", reply).await;

    let Outcome::ActionExecuted(text) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert_eq!(text, "No project is loaded.");
}

#[tokio::test]
async fn test_load_project_then_update_it() {
    let dir = TempDir::new().unwrap();
    let (mut agent, _store) = agent_in(&dir);

    let project_dir = dir.path().join("proj");
    std::fs::create_dir(&project_dir).unwrap();
    valet::ProjectLedger::init(&project_dir).unwrap();

    let load = json!({
        "tool": "load_project",
        "path": project_dir.display().to_string(),
    })
    .to_string();
    let outcome = agent.handle_reply("load my project", &load).await;
    assert!(matches!(outcome, Outcome::ActionExecuted(_)), "got {outcome:?}");

    let add = r#"{"tool": "update_project", "action": "add_task", "text": "write docs"}"#;
    let outcome = agent.handle_reply("add a task", add).await;

    let Outcome::ActionExecuted(text) = outcome else {
        panic!("expected execution, got {outcome:?}");
    };
    assert_eq!(text, "Added the task.");

    let ledger = std::fs::read_to_string(project_dir.join(".valet")).unwrap();
    assert!(ledger.contains("- [ ] write docs"));
}
