//! Audio pipeline
//!
//! Capture feeds a bounded frame queue from the device callback; the gate
//! segments drained frames into utterances; playback renders synthesized
//! speech with cooperative cancellation.

mod capture;
mod gate;
mod playback;

pub use capture::{AudioCapture, FrameQueue, SAMPLE_RATE, samples_to_wav};
pub use gate::{GateState, UtteranceGate};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
