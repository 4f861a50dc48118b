//! Reflex command shortcuts
//!
//! A fixed set of latency- and safety-critical commands matched by
//! exact/prefix pattern, bypassing the language model entirely. The stop
//! family is matched first and always wins.

/// Well-known site aliases for the `open <name>` reflex
const KNOWN_SITES: &[(&str, &str)] = &[
    ("youtube", "https://www.youtube.com"),
    ("gmail", "https://mail.google.com"),
    ("google", "https://www.google.com"),
    ("github", "https://github.com"),
    ("reddit", "https://www.reddit.com"),
    ("twitter", "https://twitter.com"),
    ("maps", "https://maps.google.com"),
    ("calendar", "https://calendar.google.com"),
    ("netflix", "https://www.netflix.com"),
    ("spotify", "https://open.spotify.com"),
];

/// Phrases that cancel speech and media output immediately
const STOP_PHRASES: &[&str] = &["stop", "silence", "shut up", "quiet", "never mind", "cancel"];

/// Phrases answered with the current time
const TIME_PHRASES: &[&str] = &[
    "what time is it",
    "what's the time",
    "what is the time",
    "time",
];

/// A recognized reflex command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reflex {
    /// Cancel active playback and media immediately
    Stop,
    /// Speak the current time
    Time,
    /// Open a well-known site in the browser
    OpenUrl { name: String, url: String },
    /// Open a local application
    OpenApp { name: String },
    /// Adjust system volume
    Volume(VolumeDirection),
}

/// Volume reflex direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Up,
    Down,
    Mute,
    Unmute,
}

/// Match a command against the reflex patterns
///
/// Recognition is pure; the caller executes the matched reflex. Returns
/// `None` when the command needs the full agent path.
#[must_use]
pub fn recognize(command: &str) -> Option<Reflex> {
    // Transcripts arrive with sentence punctuation ("Stop.", "What time
    // is it?"); matching happens on the bare phrase
    let cmd = command.trim().to_lowercase();
    let cmd = cmd.trim_end_matches(['?', '.', '!', ',']).trim_end();

    if STOP_PHRASES.contains(&cmd) {
        return Some(Reflex::Stop);
    }

    if TIME_PHRASES.contains(&cmd) {
        return Some(Reflex::Time);
    }

    match cmd {
        "volume up" | "louder" => return Some(Reflex::Volume(VolumeDirection::Up)),
        "volume down" | "softer" => return Some(Reflex::Volume(VolumeDirection::Down)),
        "mute" => return Some(Reflex::Volume(VolumeDirection::Mute)),
        "unmute" => return Some(Reflex::Volume(VolumeDirection::Unmute)),
        _ => {}
    }

    if let Some(target) = cmd.strip_prefix("open ") {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }

        for (name, url) in KNOWN_SITES {
            if target == *name {
                return Some(Reflex::OpenUrl {
                    name: (*name).to_string(),
                    url: (*url).to_string(),
                });
            }
        }

        return Some(Reflex::OpenApp {
            name: target.to_string(),
        });
    }

    None
}

/// Spoken answer for the time reflex, e.g. "It's 3:45 PM."
#[must_use]
pub fn current_time_phrase() -> String {
    let now = chrono::Local::now();
    format!("It's {}.", now.format("%-I:%M %p"))
}
