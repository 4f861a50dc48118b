//! Speech output guard
//!
//! Owns response playback: synthesis, the single active playback task, and
//! the cooperative interruption contract. At most one playback runs at a
//! time; starting a new one cancels and joins the previous task first.

mod tts;

pub use tts::TextToSpeech;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::audio::{AudioPlayback, decode_mp3};

/// The active playback task and its cancellation token.
///
/// The token exists exactly as long as playback can still be running.
struct ActivePlayback {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Guards speech output and exposes the speaking state to the rest of
/// the pipeline
pub struct SpeechGuard {
    tts: TextToSpeech,
    speaking: Arc<AtomicBool>,
    current: Option<ActivePlayback>,
}

impl SpeechGuard {
    /// Create a guard around a synthesis backend
    #[must_use]
    pub fn new(tts: TextToSpeech) -> Self {
        Self {
            tts,
            speaking: Arc::new(AtomicBool::new(false)),
            current: None,
        }
    }

    /// Synthesize `text` and start playing it
    ///
    /// Any prior playback is cancelled and joined before the new one
    /// starts. Returns the cancellation token for the new playback.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or MP3 decoding fails; the speaking
    /// state is left false in that case.
    pub async fn speak(&mut self, text: &str) -> Result<CancellationToken> {
        self.stop_current().await;

        let mp3 = self.tts.synthesize(text).await?;
        let samples = decode_mp3(&mp3)?;

        let token = CancellationToken::new();
        let task_token = token.clone();
        let flag = Arc::clone(&self.speaking);
        flag.store(true, Ordering::Relaxed);

        let task = tokio::task::spawn_blocking(move || {
            let result =
                AudioPlayback::new().and_then(|p| p.play_cancellable(samples, &task_token));
            if let Err(e) = result {
                tracing::error!(error = %e, "speech playback failed");
            }
            flag.store(false, Ordering::Relaxed);
        });

        self.current = Some(ActivePlayback {
            token: token.clone(),
            task,
        });

        Ok(token)
    }

    /// Request immediate playback stop
    ///
    /// Idempotent: calling with no active playback, or repeatedly, has no
    /// effect. The playback task observes the token within its 50ms poll.
    pub fn interrupt(&self) {
        if let Some(active) = &self.current {
            if self.is_speaking() {
                tracing::debug!("playback interrupt requested");
            }
            active.token.cancel();
        }
    }

    /// Whether playback is currently running
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }

    /// Wait for the current playback to end on its own
    pub async fn finish(&mut self) {
        if let Some(active) = self.current.take() {
            let _ = active.task.await;
        }
    }

    /// Cancel and join the current playback, if any
    async fn stop_current(&mut self) {
        if let Some(active) = self.current.take() {
            active.token.cancel();
            let _ = active.task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> SpeechGuard {
        let tts = TextToSpeech::new(
            "test-key".to_string(),
            "onyx".to_string(),
            1.0,
            "tts-1".to_string(),
        )
        .unwrap();
        SpeechGuard::new(tts)
    }

    #[test]
    fn not_speaking_initially() {
        let guard = guard();
        assert!(!guard.is_speaking());
    }

    #[test]
    fn interrupt_without_playback_is_a_noop() {
        let guard = guard();
        guard.interrupt();
        guard.interrupt();
        assert!(!guard.is_speaking());
    }

    #[tokio::test]
    async fn finish_without_playback_returns_immediately() {
        let mut guard = guard();
        guard.finish().await;
        assert!(!guard.is_speaking());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = TextToSpeech::new(
            String::new(),
            "onyx".to_string(),
            1.0,
            "tts-1".to_string(),
        );
        assert!(result.is_err());
    }
}
