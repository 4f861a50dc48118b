//! TOML configuration file loading
//!
//! Supports `~/.config/omni/valet/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ValetConfigFile {
    /// Spoken name of the assistant (e.g. "Jarvis")
    #[serde(default)]
    pub assistant_name: Option<String>,

    /// Audio capture and segmentation configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Wake phrase and conversation latch configuration
    #[serde(default)]
    pub wake: WakeFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub agent: AgentFileConfig,

    /// STT/TTS configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Audio capture and segmentation configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// RMS energy threshold above which a frame counts as speech
    pub rms_threshold: Option<f32>,

    /// Seconds of continuous silence that close an utterance
    pub silence_duration_secs: Option<f32>,

    /// Utterances shorter than this are discarded as noise
    pub min_utterance_secs: Option<f32>,

    /// Capacity of the capture frame queue, in frames
    pub queue_capacity_frames: Option<usize>,

    /// Milliseconds to keep the mic muted after an interruption
    pub cooldown_ms: Option<u64>,
}

/// Wake phrase and conversation latch configuration
#[derive(Debug, Default, Deserialize)]
pub struct WakeFileConfig {
    /// Accepted phonetic variants of the wake phrase
    pub variants: Option<Vec<String>>,

    /// Seconds the conversation latch stays open without a new command
    pub latch_timeout_secs: Option<u64>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct AgentFileConfig {
    /// Chat model identifier (e.g. "gpt-4o-mini")
    pub model: Option<String>,

    /// Vision-capable model for screen analysis (e.g. "gpt-4o")
    pub vision_model: Option<String>,
}

/// STT/TTS configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "onyx")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ValetConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ValetConfigFile {
    let Some(path) = config_file_path() else {
        return ValetConfigFile::default();
    };

    if !path.exists() {
        return ValetConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ValetConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ValetConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/omni/valet/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("valet")
            .join("config.toml")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overlays_defaults() {
        let parsed: ValetConfigFile = toml::from_str(
            r#"
            assistant_name = "Hal"

            [wake]
            latch_timeout_secs = 45

            [voice]
            tts_voice = "nova"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.assistant_name.as_deref(), Some("Hal"));
        assert_eq!(parsed.wake.latch_timeout_secs, Some(45));
        assert!(parsed.wake.variants.is_none());
        assert_eq!(parsed.voice.tts_voice.as_deref(), Some("nova"));
        assert!(parsed.audio.rms_threshold.is_none());
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let parsed: ValetConfigFile = toml::from_str("").unwrap();
        assert!(parsed.assistant_name.is_none());
        assert!(parsed.api_keys.openai.is_none());
    }
}
