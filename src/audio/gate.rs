//! Utterance segmentation
//!
//! RMS-energy voice activity detection over capture frames. Speech onset
//! opens a buffer; a sustained run of silence closes it and emits the
//! buffered samples as one utterance.

use super::SAMPLE_RATE;

/// Continuous above-threshold input is force-segmented at this bound
const MAX_UTTERANCE_SECS: f32 = 30.0;

/// State of the segmentation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for speech onset
    Silent,
    /// Accumulating an utterance
    Speaking,
}

/// Segments a frame stream into discrete utterances
pub struct UtteranceGate {
    state: GateState,
    buffer: Vec<f32>,
    silence_counter: usize,
    threshold: f32,
    silence_cutoff: usize,
    min_samples: usize,
    max_samples: usize,
}

impl UtteranceGate {
    /// Create a gate with the given RMS threshold, silence cutoff, and
    /// minimum utterance duration
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(threshold: f32, silence_duration_secs: f32, min_utterance_secs: f32) -> Self {
        let rate = SAMPLE_RATE as f32;
        Self {
            state: GateState::Silent,
            buffer: Vec::new(),
            silence_counter: 0,
            threshold,
            silence_cutoff: (silence_duration_secs.max(0.0) * rate) as usize,
            min_samples: (min_utterance_secs.max(0.0) * rate) as usize,
            max_samples: (MAX_UTTERANCE_SECS * rate) as usize,
        }
    }

    /// Feed one capture frame
    ///
    /// Returns a complete utterance when the silence cutoff closes the
    /// active buffer. Utterances whose speech portion is shorter than the
    /// minimum duration are discarded and yield `None`.
    pub fn push(&mut self, frame: &[f32]) -> Option<Vec<f32>> {
        let energy = rms(frame);
        let is_speech = energy > self.threshold;

        match self.state {
            GateState::Silent => {
                if is_speech {
                    self.state = GateState::Speaking;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(frame);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech onset");
                }
                None
            }
            GateState::Speaking => {
                self.buffer.extend_from_slice(frame);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += frame.len();
                }

                if self.silence_counter >= self.silence_cutoff {
                    return self.finish();
                }

                if self.buffer.len() >= self.max_samples {
                    tracing::debug!(
                        samples = self.buffer.len(),
                        "utterance hit length bound, segmenting"
                    );
                    return self.finish();
                }

                None
            }
        }
    }

    /// Close the active buffer and decide whether to emit it
    fn finish(&mut self) -> Option<Vec<f32>> {
        let buffer = std::mem::take(&mut self.buffer);
        let speech_len = buffer.len().saturating_sub(self.silence_counter);
        self.state = GateState::Silent;
        self.silence_counter = 0;

        if speech_len < self.min_samples {
            tracing::debug!(
                samples = speech_len,
                "utterance below minimum duration, discarded"
            );
            return None;
        }

        tracing::debug!(samples = buffer.len(), "utterance complete");
        Some(buffer)
    }

    /// Drop any in-progress utterance and return to silent
    pub fn reset(&mut self) {
        self.state = GateState::Silent;
        self.buffer.clear();
        self.silence_counter = 0;
    }

    /// Whether speech is currently being accumulated
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state == GateState::Speaking
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
