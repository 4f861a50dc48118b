//! Audio capture from microphone

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Bounded queue of capture frames between the device callback and the
/// turn loop.
///
/// The callback side never blocks: it uses `try_lock` and, when the queue
/// is full, evicts the oldest frame before appending. Frames lost to
/// contention or eviction are counted and reported via [`take_dropped`].
///
/// [`take_dropped`]: FrameQueue::take_dropped
#[derive(Debug)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<Vec<f32>>>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Append a frame from the capture callback.
    ///
    /// Never blocks. A contended lock drops the incoming frame; a full
    /// queue evicts the oldest frame first.
    pub fn push_from_callback(&self, data: &[f32]) {
        if let Ok(mut frames) = self.frames.try_lock() {
            if frames.len() >= self.capacity {
                frames.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            frames.push_back(data.to_vec());
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take all queued frames, oldest first
    #[must_use]
    pub fn drain(&self) -> Vec<Vec<f32>> {
        self.frames
            .lock()
            .map(|mut frames| frames.drain(..).collect())
            .unwrap_or_default()
    }

    /// Discard all queued frames, returning how many were discarded
    pub fn flush(&self) -> usize {
        self.frames
            .lock()
            .map(|mut frames| {
                let n = frames.len();
                frames.clear();
                n
            })
            .unwrap_or_default()
    }

    /// Number of frames dropped since the last call, resetting the counter
    pub fn take_dropped(&self) -> usize {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Current number of queued frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or_default()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Captures audio from the default input device into a [`FrameQueue`]
pub struct AudioCapture {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    queue: Arc<FrameQueue>,
    device_failed: Arc<AtomicBool>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if no input device is available or no
    /// 16kHz mono configuration is supported
    pub fn new(queue: Arc<FrameQueue>) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Device(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Device("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            queue,
            device_failed: Arc::new(AtomicBool::new(false)),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let queue = Arc::clone(&self.queue);
        let failed = Arc::clone(&self.device_failed);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device".to_string()))?;

        let config = self.config.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    queue.push_from_callback(data);
                },
                move |err| {
                    tracing::error!(error = %err, "audio capture error");
                    failed.store(true, Ordering::Relaxed);
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;

        stream.play().map_err(|e| Error::Device(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Whether the device reported a runtime failure
    #[must_use]
    pub fn device_failed(&self) -> bool {
        self.device_failed.load(Ordering::Relaxed)
    }

    /// The frame queue this capture feeds
    #[must_use]
    pub fn queue(&self) -> Arc<FrameQueue> {
        Arc::clone(&self.queue)
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_evicts_oldest_when_full() {
        let queue = FrameQueue::new(2);
        queue.push_from_callback(&[1.0]);
        queue.push_from_callback(&[2.0]);
        queue.push_from_callback(&[3.0]);

        let frames = queue.drain();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![2.0]);
        assert_eq!(frames[1], vec![3.0]);
        assert_eq!(queue.take_dropped(), 1);
    }

    #[test]
    fn queue_drain_empties_in_order() {
        let queue = FrameQueue::new(8);
        queue.push_from_callback(&[0.1, 0.2]);
        queue.push_from_callback(&[0.3]);

        let frames = queue.drain();
        assert_eq!(frames, vec![vec![0.1, 0.2], vec![0.3]]);
        assert!(queue.is_empty());
        assert_eq!(queue.take_dropped(), 0);
    }

    #[test]
    fn queue_flush_reports_discarded_count() {
        let queue = FrameQueue::new(8);
        queue.push_from_callback(&[0.0; 4]);
        queue.push_from_callback(&[0.0; 4]);

        assert_eq!(queue.flush(), 2);
        assert!(queue.is_empty());
    }
}
