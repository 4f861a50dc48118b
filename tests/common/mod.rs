//! Shared test utilities

use std::path::Path;

use valet::config::{AgentConfig, ApiKeys, AudioConfig, VoiceConfig, WakeConfig};
use valet::{Config, MemoryStore};

/// Set up an in-memory memory store
#[must_use]
pub fn setup_test_store() -> MemoryStore {
    MemoryStore::open_in_memory().expect("failed to init test store")
}

/// Build a config with a placeholder API key, rooted at `data_dir`
#[must_use]
pub fn test_config(data_dir: &Path) -> Config {
    Config {
        assistant_name: "Jarvis".to_string(),
        data_dir: data_dir.to_path_buf(),
        audio: AudioConfig {
            rms_threshold: 0.01,
            silence_duration_secs: 1.5,
            min_utterance_secs: 0.5,
            queue_capacity_frames: 100,
            cooldown_ms: 500,
        },
        wake: WakeConfig {
            variants: vec!["jarvis".to_string(), "jervis".to_string()],
            latch_timeout_secs: 20,
        },
        agent: AgentConfig {
            model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o".to_string(),
        },
        voice: VoiceConfig {
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "onyx".to_string(),
            tts_speed: 1.0,
        },
        api_keys: ApiKeys {
            openai: Some("test-key".to_string()),
        },
    }
}
