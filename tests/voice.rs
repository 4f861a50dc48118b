//! Voice pipeline integration tests
//!
//! Exercises segmentation, routing, and reflex matching without audio
//! hardware or network.

use std::io::Cursor;
use std::time::{Duration, Instant};

use valet::audio::{SAMPLE_RATE, UtteranceGate, samples_to_wav};
use valet::reflex::{self, Reflex};
use valet::{Routed, Turn, TurnRouter};

mod common;

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Feed samples through the gate in 100ms frames, collecting every
/// closed utterance
fn feed(gate: &mut UtteranceGate, samples: &[f32]) -> Vec<Vec<f32>> {
    let frame_len = SAMPLE_RATE as usize / 10;
    let mut utterances = Vec::new();
    for frame in samples.chunks(frame_len) {
        if let Some(utterance) = gate.push(frame) {
            utterances.push(utterance);
        }
    }
    utterances
}

fn test_router() -> TurnRouter {
    TurnRouter::new(
        vec!["jarvis".to_string(), "jervis".to_string()],
        Duration::from_secs(20),
    )
}

#[test]
fn test_gate_closes_utterance_after_trailing_silence() {
    let mut gate = UtteranceGate::new(0.01, 1.5, 0.5);

    let mut samples = generate_sine_samples(440.0, 1.0, 0.3);
    samples.extend(generate_silence(1.6));

    let utterances = feed(&mut gate, &samples);
    assert_eq!(utterances.len(), 1);

    // The buffer keeps the closing silence, so it is longer than the
    // speech alone
    assert!(utterances[0].len() >= SAMPLE_RATE as usize);
}

#[test]
fn test_gate_discards_short_blip() {
    let mut gate = UtteranceGate::new(0.01, 1.5, 0.5);

    // 200ms of speech is below the 500ms minimum
    let mut samples = generate_sine_samples(440.0, 0.2, 0.3);
    samples.extend(generate_silence(2.0));

    let utterances = feed(&mut gate, &samples);
    assert!(utterances.is_empty());
}

#[test]
fn test_gate_segments_consecutive_utterances() {
    let mut gate = UtteranceGate::new(0.01, 1.5, 0.5);

    let mut samples = generate_sine_samples(440.0, 1.0, 0.3);
    samples.extend(generate_silence(1.6));
    samples.extend(generate_sine_samples(330.0, 0.8, 0.3));
    samples.extend(generate_silence(1.6));

    let utterances = feed(&mut gate, &samples);
    assert_eq!(utterances.len(), 2);
}

#[test]
fn test_pure_silence_emits_nothing() {
    let mut gate = UtteranceGate::new(0.01, 1.5, 0.5);

    let utterances = feed(&mut gate, &generate_silence(5.0));
    assert!(utterances.is_empty());
    assert!(!gate.is_speaking());
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
}

#[test]
fn test_wake_phrase_with_command_routes_immediately() {
    let mut router = test_router();

    let routed = router.route(&Turn::new("Jarvis, open GitHub"));
    assert_eq!(routed, Routed::Command("open github".to_string()));
    assert!(router.is_latched());
}

#[test]
fn test_latched_follow_up_accepted_before_deadline() {
    let mut router = test_router();
    let t0 = Instant::now();

    assert_eq!(router.route(&Turn::at("jarvis", t0)), Routed::WakeOnly);

    let within = t0 + Duration::from_secs(19);
    assert_eq!(
        router.route(&Turn::at("what time is it", within)),
        Routed::Command("what time is it".to_string())
    );
}

#[test]
fn test_latch_expires_without_new_audio() {
    let mut router = test_router();
    let t0 = Instant::now();

    router.route(&Turn::at("jarvis open google", t0));
    assert!(router.is_latched());

    // Idle polling alone must close the window
    router.tick(t0 + Duration::from_secs(21));
    assert!(!router.is_latched());

    assert_eq!(
        router.route(&Turn::at("open the door", t0 + Duration::from_secs(22))),
        Routed::Ignored
    );
}

#[test]
fn test_each_command_renews_the_latch() {
    let mut router = test_router();
    let t0 = Instant::now();

    router.route(&Turn::at("jarvis", t0));
    router.route(&Turn::at("first command", t0 + Duration::from_secs(15)));

    // 30s after t0 but only 15s after the last command
    let routed = router.route(&Turn::at("second command", t0 + Duration::from_secs(30)));
    assert_eq!(routed, Routed::Command("second command".to_string()));
}

#[test]
fn test_stray_speech_without_wake_is_ignored() {
    let mut router = test_router();

    assert_eq!(router.route(&Turn::new("open the pod bay doors")), Routed::Ignored);
    assert!(!router.is_latched());
}

#[test]
fn test_wake_command_reaches_the_time_reflex() {
    let mut router = test_router();

    let routed = router.route(&Turn::new("Jarvis, what time is it?"));
    let Routed::Command(command) = routed else {
        panic!("expected a command, got {routed:?}");
    };

    assert_eq!(reflex::recognize(&command), Some(Reflex::Time));

    let phrase = reflex::current_time_phrase();
    let minute = chrono::Local::now().format("%M").to_string();
    assert!(phrase.starts_with("It's "));
    assert!(
        phrase.contains(&minute) || phrase.ends_with("M."),
        "time phrase should be speakable: {phrase}"
    );
}

#[test]
fn test_stop_reflex_survives_transcript_punctuation() {
    assert_eq!(reflex::recognize("Stop."), Some(Reflex::Stop));
    assert_eq!(reflex::recognize("Never mind."), Some(Reflex::Stop));
}

#[test]
fn test_known_site_reflex_resolves_through_routing() {
    let mut router = test_router();

    let Routed::Command(command) = router.route(&Turn::new("jervis open youtube")) else {
        panic!("expected a command");
    };

    assert_eq!(
        reflex::recognize(&command),
        Some(Reflex::OpenUrl {
            name: "youtube".to_string(),
            url: "https://www.youtube.com".to_string(),
        })
    );
}
