//! Configuration management for the valet agent

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

/// Default wake phrase variants. ASR engines routinely mangle a short
/// wake phrase, so the whole phonetic neighborhood triggers.
const DEFAULT_WAKE_VARIANTS: &[&str] = &[
    "jarvis", "darius", "jervis", "jarv", "jaravis", "jarvi", "service", "harvest", "travis",
    "davis", "chavis",
];

/// Valet agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Spoken name of the assistant
    pub assistant_name: String,

    /// Path to data directory (memory database, journal)
    pub data_dir: PathBuf,

    /// Audio capture and segmentation configuration
    pub audio: AudioConfig,

    /// Wake phrase and conversation latch configuration
    pub wake: WakeConfig,

    /// Language model configuration
    pub agent: AgentConfig,

    /// STT/TTS configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Audio capture and segmentation configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// RMS energy threshold above which a frame counts as speech
    pub rms_threshold: f32,

    /// Seconds of continuous silence that close an utterance
    pub silence_duration_secs: f32,

    /// Utterances shorter than this are discarded as noise
    pub min_utterance_secs: f32,

    /// Capacity of the capture frame queue, in frames
    pub queue_capacity_frames: usize,

    /// Milliseconds to keep the mic muted after an interruption
    pub cooldown_ms: u64,
}

impl AudioConfig {
    /// Cooldown after a playback interruption before listening resumes
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Wake phrase and conversation latch configuration
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Accepted phonetic variants of the wake phrase, lowercase
    pub variants: Vec<String>,

    /// Seconds the conversation latch stays open without a new command
    pub latch_timeout_secs: u64,
}

impl WakeConfig {
    /// Conversation latch window
    #[must_use]
    pub const fn latch_timeout(&self) -> Duration {
        Duration::from_secs(self.latch_timeout_secs)
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Chat model identifier
    pub model: String,

    /// Vision-capable model for screen analysis
    pub vision_model: String,
}

/// STT/TTS configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model
    pub stt_model: String,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, chat completions, TTS)
    pub openai: Option<String>,
}

impl Config {
    /// Load configuration with priority env > TOML file > default
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();

        let assistant_name = std::env::var("VALET_NAME")
            .ok()
            .or(fc.assistant_name)
            .unwrap_or_else(|| "Jarvis".to_string());

        let audio = AudioConfig {
            rms_threshold: std::env::var("VALET_RMS_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.rms_threshold)
                .unwrap_or(0.01),
            silence_duration_secs: std::env::var("VALET_SILENCE_DURATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.silence_duration_secs)
                .unwrap_or(1.5),
            min_utterance_secs: std::env::var("VALET_MIN_UTTERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.min_utterance_secs)
                .unwrap_or(0.5),
            queue_capacity_frames: fc.audio.queue_capacity_frames.unwrap_or(100),
            cooldown_ms: std::env::var("VALET_COOLDOWN_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.audio.cooldown_ms)
                .unwrap_or(500),
        };

        let wake = WakeConfig {
            variants: std::env::var("VALET_WAKE_VARIANTS")
                .ok()
                .map(parse_variant_list)
                .or(fc.wake.variants.map(normalize_variants))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_wake_variants),
            latch_timeout_secs: std::env::var("VALET_LATCH_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.wake.latch_timeout_secs)
                .unwrap_or(20),
        };

        let agent = AgentConfig {
            model: std::env::var("VALET_MODEL")
                .ok()
                .or(fc.agent.model)
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            vision_model: std::env::var("VALET_VISION_MODEL")
                .ok()
                .or(fc.agent.vision_model)
                .unwrap_or_else(|| "gpt-4o".to_string()),
        };

        let voice = VoiceConfig {
            stt_model: std::env::var("VALET_STT_MODEL")
                .ok()
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: std::env::var("VALET_TTS_MODEL")
                .ok()
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: std::env::var("VALET_TTS_VOICE")
                .ok()
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "onyx".to_string()),
            tts_speed: std::env::var("VALET_TTS_SPEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.voice.tts_speed)
                .unwrap_or(1.0),
        };

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
        };

        Self {
            assistant_name,
            data_dir: data_dir(),
            audio,
            wake,
            agent,
            voice,
            api_keys,
        }
    }
}

/// Default wake variants as owned strings
fn default_wake_variants() -> Vec<String> {
    DEFAULT_WAKE_VARIANTS.iter().map(ToString::to_string).collect()
}

/// Parse a comma-separated variant list from an env var
fn parse_variant_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Lowercase and drop empty entries from a file-sourced variant list
fn normalize_variants(variants: Vec<String>) -> Vec<String> {
    variants
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Return the data directory, creating it if needed
///
/// Uses `~/.local/share/omni/valet/` on Linux
pub fn data_dir() -> PathBuf {
    let dir = directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/omni/valet"),
        |d| d.data_dir().join("omni").join("valet"),
    );

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(
            path = %dir.display(),
            error = %e,
            "failed to create data directory"
        );
    }

    dir
}
