use tokio::sync::mpsc;

use crate::error::SessionError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Requested input-stream configuration
///
/// The backend honors what the platform supports; the echo-cancellation
/// and noise-suppression flags are passed through to devices that
/// expose such processing and are otherwise ignored.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    /// Target sample rate (frames are downsampled if the device
    /// delivers a higher rate)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// Microphone capture backend trait
///
/// The production implementation is `CpalBackend`; tests substitute a
/// scripted backend that replays canned frames.
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames in
    /// emission order. Fails with `DeviceUnavailable` when permission
    /// is denied or no input device exists.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError>;

    /// Stop capturing audio
    ///
    /// The hardware stream is torn down before this returns.
    async fn stop(&mut self) -> anyhow::Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
