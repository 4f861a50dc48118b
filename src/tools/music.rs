//! Background music via mpv
//!
//! Spawns `mpv` with a `ytsearch1:` query and keeps the child handle so
//! playback can be stopped on request or on barge-in. One track at a
//! time; starting a new one replaces the old.

use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

/// Handle on the mpv child process
pub struct MusicPlayer {
    child: Mutex<Option<Child>>,
    playing: AtomicBool,
}

impl MusicPlayer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            child: Mutex::new(None),
            playing: AtomicBool::new(false),
        }
    }

    /// Search for and play a track, replacing any current one
    ///
    /// # Errors
    ///
    /// Returns error if mpv is missing or cannot be spawned
    pub fn play(&self, query: &str) -> Result<String> {
        which::which("mpv")
            .map_err(|_| Error::Tool("mpv is not installed; music playback needs it".to_string()))?;

        self.kill_current();

        let child = Command::new("mpv")
            .arg("--no-video")
            .arg("--really-quiet")
            .arg(format!("ytsearch1:{query}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Tool(format!("failed to start mpv: {e}")))?;

        tracing::info!(query, pid = child.id(), "music started");

        *self.lock_child() = Some(child);
        self.playing.store(true, Ordering::SeqCst);

        Ok(format!("Playing {query}."))
    }

    /// Stop playback if anything is playing
    pub fn stop(&self) -> String {
        if self.is_playing() {
            self.kill_current();
            "Stopped the music.".to_string()
        } else {
            "Nothing is playing.".to_string()
        }
    }

    /// Whether a track is currently playing
    ///
    /// Reaps the child if it has already exited on its own.
    pub fn is_playing(&self) -> bool {
        if !self.playing.load(Ordering::SeqCst) {
            return false;
        }

        let mut guard = self.lock_child();
        let exited = guard
            .as_mut()
            .is_none_or(|child| matches!(child.try_wait(), Ok(Some(_))));

        if exited {
            *guard = None;
            self.playing.store(false, Ordering::SeqCst);
        }

        !exited
    }

    fn kill_current(&self) {
        let mut guard = self.lock_child();
        if let Some(mut child) = guard.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("music stopped");
        }
        self.playing.store(false, Ordering::SeqCst);
    }

    fn lock_child(&self) -> std::sync::MutexGuard<'_, Option<Child>> {
        self.child
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MusicPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        self.kill_current();
    }
}
