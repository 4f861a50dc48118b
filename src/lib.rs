//! Valet - a voice-driven desktop command agent
//!
//! This library provides the core functionality for the valet daemon:
//! - Audio capture and energy-gated utterance segmentation
//! - Wake phrase routing with a conversation latch
//! - Reflex shortcuts for latency-critical commands
//! - An LLM-backed agent core with confirmation for destructive actions
//! - Guarded, interruptible speech output
//!
//! # Architecture
//!
//! ```text
//! microphone ─► FrameQueue ─► UtteranceGate ─► Transcriber
//!                                                  │
//!                                              TurnRouter
//!                                              │        │
//!                                          ReflexLayer  AgentCore ─► tools
//!                                              │        │
//!                                              ▼        ▼
//!                                            SpeechGuard ─► speakers
//! ```

pub mod agent;
pub mod audio;
pub mod config;
pub mod daemon;
pub mod error;
pub mod memory;
pub mod reflex;
pub mod router;
pub mod speech;
pub mod tools;
pub mod transcribe;
pub mod ui;

pub use agent::{AgentCore, Outcome};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use memory::{Journal, MemoryStore, ProjectLedger};
pub use router::{Routed, Turn, TurnRouter};
pub use speech::SpeechGuard;
pub use tools::{ActionRequest, MusicPlayer};
pub use ui::{AgentStatus, StatusFeed};
