//! Platform-specific desktop actions
//!
//! Apps, URLs, clipboard, synthetic input, media keys, and volume. Every
//! action shells out to the platform's own tooling: `open`/`osascript` on
//! macOS, `xdg-open`/`xdotool`/`xclip`/`pactl`/`playerctl` on Linux.

use crate::reflex::VolumeDirection;
use crate::tools::MediaAction;
use crate::{Error, Result};

/// Launch a desktop application by name
///
/// # Errors
///
/// Returns error if the application cannot be launched
pub fn open_app(name: &str) -> Result<String> {
    #[cfg(target_os = "macos")]
    return open_app_macos(name);

    #[cfg(target_os = "linux")]
    return open_app_linux(name);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = name;
        Err(unsupported("app launching"))
    }
}

/// Open a URL in the default browser
///
/// # Errors
///
/// Returns error if the URL is not http(s) or the browser cannot be opened
pub fn open_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| Error::Tool(format!("invalid url: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Tool(format!("refusing to open non-http url: {url}")));
    }

    #[cfg(target_os = "macos")]
    return open_url_macos(url);

    #[cfg(target_os = "linux")]
    return open_url_linux(url);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    Err(unsupported("url opening"))
}

/// Run a web search in the default browser
///
/// # Errors
///
/// Returns error if the browser cannot be opened
pub fn web_search(query: &str) -> Result<String> {
    let search_url = format!(
        "https://www.google.com/search?q={}",
        urlencoding::encode(query)
    );
    open_url(&search_url)?;
    Ok(format!("Searching for {query}."))
}

/// Press a media transport key
///
/// # Errors
///
/// Returns error if the media control cannot be issued
pub fn media_control(action: MediaAction) -> Result<String> {
    #[cfg(target_os = "macos")]
    return media_control_macos(action);

    #[cfg(target_os = "linux")]
    return media_control_linux(action);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = action;
        Err(unsupported("media control"))
    }
}

/// Adjust the system output volume
///
/// # Errors
///
/// Returns error if the volume cannot be changed
pub fn volume(direction: VolumeDirection) -> Result<String> {
    #[cfg(target_os = "macos")]
    return volume_macos(direction);

    #[cfg(target_os = "linux")]
    return volume_linux(direction);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = direction;
        Err(unsupported("volume control"))
    }
}

/// Read the system clipboard
///
/// # Errors
///
/// Returns error if the clipboard cannot be read
pub fn query_clipboard() -> Result<String> {
    #[cfg(target_os = "macos")]
    return run_capture("pbpaste", &[]);

    #[cfg(target_os = "linux")]
    return run_capture("xclip", &["-selection", "clipboard", "-o"]);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    Err(unsupported("clipboard access"))
}

/// Type text into the focused window
///
/// # Errors
///
/// Returns error if synthetic input cannot be delivered
pub fn type_text(text: &str) -> Result<String> {
    #[cfg(target_os = "macos")]
    return type_text_macos(text);

    #[cfg(target_os = "linux")]
    return type_text_linux(text);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = text;
        Err(unsupported("synthetic typing"))
    }
}

/// Press a named key in the focused window
///
/// # Errors
///
/// Returns error if the key name is unknown or the press fails
pub fn press_key(key: &str) -> Result<String> {
    #[cfg(target_os = "macos")]
    return press_key_macos(&key.trim().to_lowercase());

    #[cfg(target_os = "linux")]
    return press_key_linux(&key.trim().to_lowercase());

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = key;
        Err(unsupported("key presses"))
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn unsupported(what: &str) -> Error {
    Error::Tool(format!("{what} not supported on this platform"))
}

/// Run a command, mapping a non-zero exit to an error
#[cfg(any(target_os = "macos", target_os = "linux"))]
fn run(program: &str, args: &[&str]) -> Result<()> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::Tool(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Tool(format!("{program} failed: {}", stderr.trim())));
    }

    Ok(())
}

/// Run a command and capture trimmed stdout
#[cfg(any(target_os = "macos", target_os = "linux"))]
fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::Tool(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Tool(format!("{program} failed: {}", stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn media_ack(action: MediaAction) -> String {
    match action {
        MediaAction::PlayPause => "Toggled playback.".to_string(),
        MediaAction::Next => "Skipping ahead.".to_string(),
        MediaAction::Previous => "Going back.".to_string(),
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn volume_ack(direction: VolumeDirection) -> String {
    match direction {
        VolumeDirection::Up => "Volume up.".to_string(),
        VolumeDirection::Down => "Volume down.".to_string(),
        VolumeDirection::Mute => "Muted.".to_string(),
        VolumeDirection::Unmute => "Unmuted.".to_string(),
    }
}

// --- macOS ---

#[cfg(target_os = "macos")]
fn open_app_macos(name: &str) -> Result<String> {
    run("open", &["-a", name])?;
    Ok(format!("Opening {name}."))
}

#[cfg(target_os = "macos")]
fn open_url_macos(url: &str) -> Result<String> {
    run("open", &[url])?;
    Ok("Opening that in your browser.".to_string())
}

#[cfg(target_os = "macos")]
fn media_control_macos(action: MediaAction) -> Result<String> {
    let script = match action {
        MediaAction::PlayPause => "tell application \"Music\" to playpause",
        MediaAction::Next => "tell application \"Music\" to next track",
        MediaAction::Previous => "tell application \"Music\" to previous track",
    };
    run("osascript", &["-e", script])?;
    Ok(media_ack(action))
}

#[cfg(target_os = "macos")]
fn volume_macos(direction: VolumeDirection) -> Result<String> {
    let script = match direction {
        VolumeDirection::Up => {
            "set volume output volume ((output volume of (get volume settings)) + 10)"
        }
        VolumeDirection::Down => {
            "set volume output volume ((output volume of (get volume settings)) - 10)"
        }
        VolumeDirection::Mute => "set volume output muted true",
        VolumeDirection::Unmute => "set volume output muted false",
    };
    run("osascript", &["-e", script])?;
    Ok(volume_ack(direction))
}

#[cfg(target_os = "macos")]
fn type_text_macos(text: &str) -> Result<String> {
    let script = format!(
        "tell application \"System Events\" to keystroke \"{}\"",
        escape_applescript(text)
    );
    run("osascript", &["-e", &script])?;
    Ok("Typed it.".to_string())
}

#[cfg(target_os = "macos")]
fn press_key_macos(key: &str) -> Result<String> {
    // System Events key codes for the named keys we accept
    let code = match key {
        "enter" | "return" => 36,
        "tab" => 48,
        "space" => 49,
        "escape" | "esc" => 53,
        "backspace" | "delete" => 51,
        "left" => 123,
        "right" => 124,
        "down" => 125,
        "up" => 126,
        _ => return Err(Error::Tool(format!("unknown key: {key}"))),
    };
    let script = format!("tell application \"System Events\" to key code {code}");
    run("osascript", &["-e", &script])?;
    Ok(format!("Pressed {key}."))
}

#[cfg(target_os = "macos")]
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

// --- Linux ---

#[cfg(target_os = "linux")]
fn open_app_linux(name: &str) -> Result<String> {
    // Detached spawn; the app's lifetime is not ours to manage
    std::process::Command::new(name.to_lowercase())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| Error::Tool(format!("failed to launch {name}: {e}")))?;

    Ok(format!("Opening {name}."))
}

#[cfg(target_os = "linux")]
fn open_url_linux(url: &str) -> Result<String> {
    run("xdg-open", &[url])?;
    Ok("Opening that in your browser.".to_string())
}

#[cfg(target_os = "linux")]
fn media_control_linux(action: MediaAction) -> Result<String> {
    let verb = match action {
        MediaAction::PlayPause => "play-pause",
        MediaAction::Next => "next",
        MediaAction::Previous => "previous",
    };
    run("playerctl", &[verb])?;
    Ok(media_ack(action))
}

#[cfg(target_os = "linux")]
fn volume_linux(direction: VolumeDirection) -> Result<String> {
    let args: &[&str] = match direction {
        VolumeDirection::Up => &["set-sink-volume", "@DEFAULT_SINK@", "+10%"],
        VolumeDirection::Down => &["set-sink-volume", "@DEFAULT_SINK@", "-10%"],
        VolumeDirection::Mute => &["set-sink-mute", "@DEFAULT_SINK@", "1"],
        VolumeDirection::Unmute => &["set-sink-mute", "@DEFAULT_SINK@", "0"],
    };
    run("pactl", args)?;
    Ok(volume_ack(direction))
}

#[cfg(target_os = "linux")]
fn type_text_linux(text: &str) -> Result<String> {
    run("xdotool", &["type", "--delay", "20", text])?;
    Ok("Typed it.".to_string())
}

#[cfg(target_os = "linux")]
fn press_key_linux(key: &str) -> Result<String> {
    let name = match key {
        "enter" | "return" => "Return",
        "tab" => "Tab",
        "space" => "space",
        "escape" | "esc" => "Escape",
        "backspace" | "delete" => "BackSpace",
        "left" => "Left",
        "right" => "Right",
        "down" => "Down",
        "up" => "Up",
        _ => return Err(Error::Tool(format!("unknown key: {key}"))),
    };
    run("xdotool", &["key", name])?;
    Ok(format!("Pressed {key}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_urls_are_refused() {
        assert!(open_url("file:///etc/passwd").is_err());
        assert!(open_url("javascript:alert(1)").is_err());
        assert!(open_url("not a url").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(press_key("hyper-mega-key").is_err());
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn applescript_escaping() {
        assert_eq!(escape_applescript(r#"say "hi""#), r#"say \"hi\""#);
    }
}
