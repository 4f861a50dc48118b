//! Daemon - the voice agent service
//!
//! Owns the whole pipeline: audio capture, utterance gating,
//! transcription, turn routing, reflexes, the agent core, and guarded
//! speech output, coordinated from a single polling loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::agent::{AgentCore, Outcome};
use crate::audio::{AudioCapture, FrameQueue, UtteranceGate};
use crate::memory::{Journal, MemoryStore};
use crate::reflex::{self, Reflex};
use crate::router::{Routed, Turn, TurnRouter};
use crate::speech::{SpeechGuard, TextToSpeech};
use crate::tools::{MusicPlayer, system};
use crate::transcribe::Transcriber;
use crate::ui::{self, AgentStatus, StatusFeed};
use crate::{Config, Error, Result};

/// Coordinator poll interval
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Spoken acknowledgment for a bare wake phrase
const WAKE_ACK: &str = "Yes?";

/// What a processed tick asks the run loop to do next
enum TickFlow {
    Continue,
    Shutdown,
}

/// The valet daemon - orchestrates the voice pipeline
pub struct Daemon {
    config: Config,
    memory: MemoryStore,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the memory store cannot be opened
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.data_dir.join("valet.db");
        let memory = MemoryStore::open(&db_path)?;

        tracing::info!(path = %db_path.display(), "memory store opened");

        Ok(Self { config, memory })
    }

    /// Run the daemon until Ctrl-C, an exit command, or a fatal device
    /// error
    ///
    /// The voice pipeline lives on this task: cpal streams aren't Send,
    /// so capture cannot move across threads.
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator cannot be constructed or the
    /// input device fails mid-run.
    #[allow(clippy::future_not_send, clippy::too_many_lines)]
    pub async fn run(self) -> Result<()> {
        let api_key = self.config.api_keys.openai.clone().unwrap_or_default();

        let transcriber = Transcriber::new(api_key.clone(), self.config.voice.stt_model.clone())?;

        #[allow(clippy::cast_possible_truncation)]
        let tts = TextToSpeech::new(
            api_key,
            self.config.voice.tts_voice.clone(),
            self.config.voice.tts_speed as f32,
            self.config.voice.tts_model.clone(),
        )?;
        let mut guard = SpeechGuard::new(tts);

        let music = Arc::new(MusicPlayer::new());
        let journal = Journal::new(&self.config.data_dir);
        let mut agent = AgentCore::new(
            &self.config,
            self.memory.clone(),
            journal,
            Arc::clone(&music),
        )?;

        let frames = Arc::new(FrameQueue::new(self.config.audio.queue_capacity_frames));
        let mut capture = AudioCapture::new(Arc::clone(&frames))?;
        let mut gate = UtteranceGate::new(
            self.config.audio.rms_threshold,
            self.config.audio.silence_duration_secs,
            self.config.audio.min_utterance_secs,
        );
        let mut router = TurnRouter::new(
            self.config.wake.variants.clone(),
            self.config.wake.latch_timeout(),
        );

        let status = StatusFeed::new();
        tokio::spawn(ui::print_transitions(status.subscribe()));

        // Ctrl-C flows through a channel so the select loop owns shutdown
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        capture.start()?;
        tracing::info!(
            name = %self.config.assistant_name,
            wake_variants = self.config.wake.variants.len(),
            "listening"
        );

        let mut cooldown_until: Option<Instant> = None;

        let result = loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break Ok(());
                }
                () = tokio::time::sleep(TICK_INTERVAL) => {
                    let tick = self
                        .process_tick(
                            &capture,
                            &frames,
                            &mut gate,
                            &mut router,
                            &transcriber,
                            &mut agent,
                            &mut guard,
                            &music,
                            &status,
                            &mut cooldown_until,
                        )
                        .await;

                    match tick {
                        Ok(TickFlow::Continue) => {}
                        Ok(TickFlow::Shutdown) => break Ok(()),
                        Err(e) if e.is_fatal() => break Err(e),
                        Err(e) => tracing::error!(error = %e, "turn processing failed"),
                    }
                }
            }
        };

        guard.finish().await;
        music.stop();
        capture.stop();
        tracing::info!("daemon stopped");

        result
    }

    /// Process one poll tick: expire the latch, drain captured audio,
    /// close utterances, and route the resulting turns.
    #[allow(clippy::too_many_arguments, clippy::future_not_send)]
    async fn process_tick(
        &self,
        capture: &AudioCapture,
        frames: &FrameQueue,
        gate: &mut UtteranceGate,
        router: &mut TurnRouter,
        transcriber: &Transcriber,
        agent: &mut AgentCore,
        guard: &mut SpeechGuard,
        music: &MusicPlayer,
        status: &StatusFeed,
        cooldown_until: &mut Option<Instant>,
    ) -> Result<TickFlow> {
        if capture.device_failed() {
            return Err(Error::Device("input stream failed".to_string()));
        }

        router.tick(Instant::now());

        let dropped = frames.take_dropped();
        if dropped > 0 {
            tracing::warn!(frames = dropped, "capture queue overflowed, oldest dropped");
        }

        let mut utterances = Vec::new();
        for frame in frames.drain() {
            if let Some(utterance) = gate.push(&frame) {
                utterances.push(utterance);
            }
        }

        for utterance in utterances {
            if let Some(until) = *cooldown_until {
                if Instant::now() < until {
                    tracing::debug!("cooldown active, utterance discarded");
                    continue;
                }
                *cooldown_until = None;
            }

            let text = transcriber.transcribe(&utterance).await;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            tracing::debug!(text = %text, "utterance transcribed");

            // Barge-in guard: while output is active only the stop
            // family gets through, and the turn never touches the router
            if guard.is_speaking() || music.is_playing() {
                if stop_requested(text, &self.config.wake.variants) {
                    self.interrupt_output(guard, music, frames, cooldown_until);
                } else {
                    tracing::info!(reason = "barge-in guard", text = %text, "utterance dropped");
                }
                continue;
            }

            match router.route(&Turn::new(text)) {
                Routed::Ignored => {}
                Routed::WakeOnly => {
                    speak(guard, status, WAKE_ACK).await;
                }
                Routed::Command(command) => {
                    let flow = self
                        .handle_command(
                            &command,
                            agent,
                            guard,
                            music,
                            frames,
                            status,
                            cooldown_until,
                        )
                        .await;
                    if matches!(flow, TickFlow::Shutdown) {
                        return Ok(TickFlow::Shutdown);
                    }
                }
            }
        }

        // Keep the feed honest between events: playback ends and latches
        // expire without any utterance arriving
        let settled = if guard.is_speaking() {
            AgentStatus::Speaking
        } else if router.is_latched() {
            AgentStatus::Listening
        } else {
            AgentStatus::Idle
        };
        status.set(settled);

        Ok(TickFlow::Continue)
    }

    /// Execute one routed command: reflexes first, then the agent path
    #[allow(clippy::too_many_arguments, clippy::future_not_send)]
    async fn handle_command(
        &self,
        command: &str,
        agent: &mut AgentCore,
        guard: &mut SpeechGuard,
        music: &MusicPlayer,
        frames: &FrameQueue,
        status: &StatusFeed,
        cooldown_until: &mut Option<Instant>,
    ) -> TickFlow {
        if let Some(reflex) = reflex::recognize(command) {
            tracing::info!(command = %command, "reflex matched");
            self.run_reflex(reflex, guard, music, frames, status, cooldown_until)
                .await;
            return TickFlow::Continue;
        }

        status.set(AgentStatus::Processing);
        match agent.handle(command).await {
            Outcome::Spoken(text) | Outcome::ActionExecuted(text) => {
                speak(guard, status, &text).await;
                TickFlow::Continue
            }
            Outcome::Exit(farewell) => {
                speak(guard, status, &farewell).await;
                guard.finish().await;
                TickFlow::Shutdown
            }
        }
    }

    /// Run a reflex without involving the language backend
    async fn run_reflex(
        &self,
        reflex: Reflex,
        guard: &mut SpeechGuard,
        music: &MusicPlayer,
        frames: &FrameQueue,
        status: &StatusFeed,
        cooldown_until: &mut Option<Instant>,
    ) {
        match reflex {
            Reflex::Stop => self.interrupt_output(guard, music, frames, cooldown_until),
            Reflex::Time => speak(guard, status, &reflex::current_time_phrase()).await,
            Reflex::OpenUrl { name, url } => match system::open_url(&url) {
                Ok(_) => speak(guard, status, &format!("Opening {name}.")).await,
                Err(e) => {
                    tracing::error!(error = %e, url = %url, "url reflex failed");
                    speak(guard, status, &format!("I couldn't open {name}.")).await;
                }
            },
            Reflex::OpenApp { name } => match system::open_app(&name) {
                Ok(ack) => speak(guard, status, &ack).await,
                Err(e) => {
                    tracing::error!(error = %e, app = %name, "app reflex failed");
                    speak(guard, status, &format!("I couldn't open {name}.")).await;
                }
            },
            Reflex::Volume(direction) => match system::volume(direction) {
                Ok(ack) => speak(guard, status, &ack).await,
                Err(e) => {
                    tracing::error!(error = %e, "volume reflex failed");
                    speak(guard, status, "I couldn't change the volume.").await;
                }
            },
        }
    }

    /// Cancel all active output and mute listening briefly
    ///
    /// The frame queue is flushed so the tail of our own speech never
    /// comes back as an utterance.
    fn interrupt_output(
        &self,
        guard: &SpeechGuard,
        music: &MusicPlayer,
        frames: &FrameQueue,
        cooldown_until: &mut Option<Instant>,
    ) {
        guard.interrupt();
        music.stop();
        let flushed = frames.flush();
        *cooldown_until = Some(Instant::now() + self.config.audio.cooldown());
        tracing::info!(flushed_frames = flushed, "output interrupted");
    }
}

/// Speak a response, mirroring the speaking state into the status feed
///
/// Synthesis failures are logged and swallowed; losing one response must
/// not take the daemon down.
async fn speak(guard: &mut SpeechGuard, status: &StatusFeed, text: &str) {
    status.set(AgentStatus::Speaking);
    if let Err(e) = guard.speak(text).await {
        tracing::error!(error = %e, "speech output failed");
    }
}

/// Detect the stop family during barge-in, tolerating a leading wake
/// phrase ("jarvis stop")
fn stop_requested(text: &str, wake_variants: &[String]) -> bool {
    if matches!(reflex::recognize(text), Some(Reflex::Stop)) {
        return true;
    }

    let lowered = text.trim().to_lowercase();
    wake_variants.iter().any(|variant| {
        lowered.find(variant.as_str()).is_some_and(|idx| {
            let after = lowered[idx + variant.len()..]
                .trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == '.');
            matches!(reflex::recognize(after), Some(Reflex::Stop))
        })
    })
}
