use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use valet::audio::{AudioCapture, AudioPlayback, FrameQueue, PLAYBACK_SAMPLE_RATE};
use valet::speech::TextToSpeech;
use valet::{Config, Daemon};

/// Valet - voice-driven desktop command agent
#[derive(Parser)]
#[command(name = "valet", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,valet=info",
        1 => "info,valet=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text).await,
        };
    }

    let config = Config::load();
    tracing::info!(
        name = %config.assistant_name,
        data_dir = %config.data_dir.display(),
        "starting valet"
    );

    let wake = config
        .wake
        .variants
        .first()
        .cloned()
        .unwrap_or_else(|| "jarvis".to_string());

    let daemon = Daemon::new(config)?;
    tracing::info!("valet ready - say \"{wake}\"");

    daemon.run().await?;

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Listening for {duration} seconds. Say something.\n");

    let queue = Arc::new(FrameQueue::new(256));
    let mut capture = AudioCapture::new(Arc::clone(&queue))?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Capture device at {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples: Vec<f32> = queue.drain().into_iter().flatten().collect();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("A moving meter means the mic path is good.");
    println!("If RMS never left 0.0000:");
    println!("  - check the default source: pactl info | grep 'Default Source'");
    println!("  - list capture devices: arecord -l");
    println!("  - check input levels in pavucontrol");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("You should hear a 440 Hz tone for 2 seconds.\n");

    let playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    // Sine at 30% amplitude, loud enough to hear without startling anyone
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!(
        "Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...",
        samples.len()
    );

    playback.play(samples).await?;

    println!("\n---");
    println!("Silence here usually means the wrong sink is default:");
    println!("  - pactl info | grep 'Default Sink'");
    println!("  - pactl list sinks short");
    println!("  - check output levels in pavucontrol");

    Ok(())
}

/// Test TTS output
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Synthesizing and playing: \"{text}\"\n");

    let config = Config::load();
    let api_key = config.api_keys.openai.clone().unwrap_or_default();

    #[allow(clippy::cast_possible_truncation)]
    let tts = TextToSpeech::new(
        api_key,
        config.voice.tts_voice.clone(),
        config.voice.tts_speed as f32,
        config.voice.tts_model.clone(),
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Received {} bytes of audio", mp3_data.len());

    // Header bytes distinguish a real MP3 from an API error body
    if mp3_data.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            mp3_data[0], mp3_data[1], mp3_data[2], mp3_data[3]
        );
    }

    println!("Playing audio...");
    let playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If the text was spoken aloud, the TTS path is good.");

    Ok(())
}
