//! Screen capture
//!
//! Grabs the full screen to a temporary PNG and returns the bytes. The
//! vision call that interprets the image lives with the agent; this
//! module only knows how to take the picture.

use std::path::Path;

use crate::{Error, Result};

/// Capture the screen as PNG bytes
///
/// # Errors
///
/// Returns error if no screenshot tool is available or capture fails
pub fn capture() -> Result<Vec<u8>> {
    let file = tempfile::Builder::new()
        .prefix("valet-screen-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| Error::Tool(format!("failed to create screenshot file: {e}")))?;

    capture_to(file.path())?;

    let bytes = std::fs::read(file.path())
        .map_err(|e| Error::Tool(format!("failed to read screenshot: {e}")))?;

    if bytes.is_empty() {
        return Err(Error::Tool("screenshot came back empty".to_string()));
    }

    tracing::debug!(bytes = bytes.len(), "screen captured");
    Ok(bytes)
}

fn capture_to(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    return capture_macos(path);

    #[cfg(target_os = "linux")]
    return capture_linux(path);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = path;
        Err(Error::Tool(
            "screen capture not supported on this platform".to_string(),
        ))
    }
}

#[cfg(target_os = "macos")]
fn capture_macos(path: &Path) -> Result<()> {
    run_capture_tool("screencapture", &["-x"], path)
}

#[cfg(target_os = "linux")]
fn capture_linux(path: &Path) -> Result<()> {
    // gnome-screenshot handles Wayland sessions; scrot covers bare X11
    if which::which("gnome-screenshot").is_ok() {
        return run_capture_tool("gnome-screenshot", &["-f"], path);
    }
    if which::which("scrot").is_ok() {
        return run_capture_tool("scrot", &["-o"], path);
    }

    Err(Error::Tool(
        "no screenshot tool found; install gnome-screenshot or scrot".to_string(),
    ))
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn run_capture_tool(program: &str, args: &[&str], path: &Path) -> Result<()> {
    let output = std::process::Command::new(program)
        .args(args)
        .arg(path)
        .output()
        .map_err(|e| Error::Tool(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Tool(format!("{program} failed: {}", stderr.trim())));
    }

    Ok(())
}
