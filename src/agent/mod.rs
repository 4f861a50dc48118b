//! The command-handling brain: backend calls, reply parsing, and the
//! confirmation protocol for destructive actions

mod core;
mod llm;
mod parse;
mod policy;

pub use self::core::{AgentCore, CANCELLED_REPLY, CONFUSED_REPLY, OFFLINE_REPLY, Outcome};
pub use llm::LlmClient;
pub use parse::{AgentReply, parse_reply};
pub use policy::{confirmation_question, destructive_payload, is_affirmative, is_destructive};
