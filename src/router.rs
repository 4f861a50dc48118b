//! Turn routing state machine
//!
//! Decides what each transcribed turn is: a wake-up, a command, a latched
//! follow-up, or noise. Owns the conversation latch and its deadline.

use std::time::{Duration, Instant};

/// One transcribed turn
#[derive(Debug, Clone)]
pub struct Turn {
    /// Transcript text
    pub text: String,
    /// When the utterance was transcribed
    pub timestamp: Instant,
}

impl Turn {
    /// Create a turn stamped now
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Instant::now(),
        }
    }

    /// Create a turn with an explicit timestamp
    #[must_use]
    pub fn at(text: impl Into<String>, timestamp: Instant) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }
}

/// Routing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// No latch, waiting for a wake phrase
    Idle,
    /// Wake phrase heard with no command text after it
    AwaitingCommand,
    /// Conversation window open, turns accepted without the wake phrase
    Latched,
}

/// What the router decided about a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Emit this command downstream
    Command(String),
    /// Wake phrase alone; the latch opened but there is nothing to run yet
    WakeOnly,
    /// Noise, nothing to do
    Ignored,
}

/// Wake-word and conversation-latch state machine
pub struct TurnRouter {
    variants: Vec<String>,
    latch_timeout: Duration,
    state: RouterState,
    latch_deadline: Option<Instant>,
    last_interaction: Option<Instant>,
}

impl TurnRouter {
    /// Create a router accepting the given wake phrase variants
    #[must_use]
    pub fn new(variants: Vec<String>, latch_timeout: Duration) -> Self {
        let normalized: Vec<String> = variants
            .into_iter()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        tracing::debug!(variants = ?normalized, ?latch_timeout, "turn router initialized");

        Self {
            variants: normalized,
            latch_timeout,
            state: RouterState::Idle,
            latch_deadline: None,
            last_interaction: None,
        }
    }

    /// Route one turn
    ///
    /// The turn's own timestamp is the router's clock, so an expired latch
    /// is observed before the turn is interpreted. Text is normalized to
    /// lowercase; emitted commands are lowercase.
    pub fn route(&mut self, turn: &Turn) -> Routed {
        let now = turn.timestamp;
        self.expire_if_due(now);

        let text = turn.text.trim().to_lowercase();
        let text = text.as_str();
        if text.is_empty() {
            return Routed::Ignored;
        }

        match self.state {
            RouterState::Idle => match self.match_wake(text) {
                Some(command) if command.is_empty() => {
                    self.open_latch(now, RouterState::AwaitingCommand);
                    tracing::info!("wake phrase heard, awaiting command");
                    Routed::WakeOnly
                }
                Some(command) => {
                    self.open_latch(now, RouterState::Latched);
                    tracing::info!(command = %command, "wake phrase with command");
                    Routed::Command(command)
                }
                None => Routed::Ignored,
            },
            RouterState::AwaitingCommand => {
                // A repeated bare wake phrase keeps the window open
                match self.match_wake(text) {
                    Some(command) if command.is_empty() => {
                        self.open_latch(now, RouterState::AwaitingCommand);
                        Routed::WakeOnly
                    }
                    Some(command) => {
                        self.open_latch(now, RouterState::Latched);
                        Routed::Command(command)
                    }
                    None => {
                        self.open_latch(now, RouterState::Latched);
                        Routed::Command(text.to_string())
                    }
                }
            }
            RouterState::Latched => {
                if text.chars().count() <= 2 {
                    return Routed::Ignored;
                }

                // Strip a redundant wake phrase so the command downstream
                // stays clean for reflex matching
                let command = match self.match_wake(text) {
                    Some(c) if !c.is_empty() => c,
                    _ => text.to_string(),
                };

                self.open_latch(now, RouterState::Latched);
                Routed::Command(command)
            }
        }
    }

    /// Drop the latch if its deadline passed
    ///
    /// Called on every idle poll, not only when audio arrives.
    pub fn tick(&mut self, now: Instant) {
        self.expire_if_due(now);
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> RouterState {
        self.state
    }

    /// Whether the conversation window is open
    #[must_use]
    pub fn is_latched(&self) -> bool {
        self.state != RouterState::Idle
    }

    /// Deadline of the open latch, if any
    #[must_use]
    pub const fn latch_deadline(&self) -> Option<Instant> {
        self.latch_deadline
    }

    /// Timestamp of the last accepted interaction, if any
    #[must_use]
    pub const fn last_interaction(&self) -> Option<Instant> {
        self.last_interaction
    }

    fn open_latch(&mut self, now: Instant, state: RouterState) {
        self.state = state;
        self.latch_deadline = Some(now + self.latch_timeout);
        self.last_interaction = Some(now);
    }

    fn expire_if_due(&mut self, now: Instant) {
        if self.state == RouterState::Idle {
            return;
        }

        if let Some(deadline) = self.latch_deadline {
            if now >= deadline {
                tracing::debug!("conversation latch expired");
                self.state = RouterState::Idle;
                self.latch_deadline = None;
            }
        }
    }

    /// Find a wake variant in lowercase text and return the command after it
    ///
    /// Variants are tried in configured order; the command is the text
    /// following the matched variant's first occurrence, with leading
    /// whitespace and punctuation stripped.
    fn match_wake(&self, text: &str) -> Option<String> {
        for variant in &self.variants {
            if let Some(idx) = text.find(variant.as_str()) {
                let after = &text[idx + variant.len()..];
                let command = after
                    .trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == '.')
                    .trim_end()
                    .to_string();
                return Some(command);
            }
        }

        None
    }
}
