//! Assistant status feed
//!
//! A watch channel carrying the coarse assistant state. The daemon
//! publishes transitions; the console printer (and any future overlay)
//! subscribes. Publishing never blocks and never fails the caller, even
//! with no subscribers attached.

use tokio::sync::watch;

/// Coarse assistant state for frontends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentStatus {
    /// Waiting for the wake word
    #[default]
    Idle,
    /// Latch open, listening for a command
    Listening,
    /// A command is in flight through the agent
    Processing,
    /// Response playback is running
    Speaking,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publishing side of the status feed
pub struct StatusFeed {
    tx: watch::Sender<AgentStatus>,
}

impl StatusFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AgentStatus::default());
        Self { tx }
    }

    /// Publish a state, fire-and-forget
    pub fn set(&self, status: AgentStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            tracing::debug!(from = previous.as_str(), to = status.as_str(), "status change");
        }
    }

    /// Current state
    #[must_use]
    pub fn current(&self) -> AgentStatus {
        *self.tx.borrow()
    }

    /// Attach a subscriber
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AgentStatus> {
        self.tx.subscribe()
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Log every status transition until the feed closes
pub async fn print_transitions(mut rx: watch::Receiver<AgentStatus>) {
    while rx.changed().await.is_ok() {
        let status = *rx.borrow_and_update();
        tracing::info!(status = status.as_str(), "assistant state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let feed = StatusFeed::new();
        assert_eq!(feed.current(), AgentStatus::Idle);
    }

    #[test]
    fn set_without_subscribers_is_fine() {
        let feed = StatusFeed::new();
        feed.set(AgentStatus::Listening);
        assert_eq!(feed.current(), AgentStatus::Listening);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let feed = StatusFeed::new();
        let mut rx = feed.subscribe();

        feed.set(AgentStatus::Processing);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), AgentStatus::Processing);
    }

    #[test]
    fn status_names_are_stable() {
        assert_eq!(AgentStatus::Idle.to_string(), "idle");
        assert_eq!(AgentStatus::Speaking.to_string(), "speaking");
    }
}
