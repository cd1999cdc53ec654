use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConstraints};
use super::encoder::{AudioChunk, ChunkEncoder};
use super::mic::CpalBackend;
use crate::config::AudioConfig;
use crate::error::SessionError;

/// Owns the microphone backend and the chunk encoder for one session.
///
/// Captured audio is buffered locally as encoded chunks on a fixed
/// cadence and never routed to a playback path (no local monitoring).
/// `stop` concatenates the chunks in emission order into a single
/// payload and releases the device before returning.
pub struct CaptureController {
    backend: Box<dyn CaptureBackend>,
    constraints: CaptureConstraints,
    preferred_codec: String,
    chunk_interval_ms: u64,
    active: Option<ActiveCapture>,
    streams_opened: usize,
    streams_closed: usize,
}

struct ActiveCapture {
    chunk_task: JoinHandle<Vec<AudioChunk>>,
}

impl CaptureController {
    pub fn new(audio: &AudioConfig) -> Self {
        let constraints = CaptureConstraints {
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            ..CaptureConstraints::default()
        };

        let backend = Box::new(CpalBackend::new(constraints.clone()));
        Self::with_backend(backend, audio)
    }

    /// Construct with an explicit backend (used by tests)
    pub fn with_backend(backend: Box<dyn CaptureBackend>, audio: &AudioConfig) -> Self {
        Self {
            backend,
            constraints: CaptureConstraints {
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                ..CaptureConstraints::default()
            },
            preferred_codec: audio.preferred_codec.clone(),
            chunk_interval_ms: audio.chunk_interval_ms,
            active: None,
            streams_opened: 0,
            streams_closed: 0,
        }
    }

    /// Open the input stream and start emitting encoded chunks.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.active.is_some() {
            warn!("Capture already running");
            return Ok(());
        }

        let frame_rx = self.backend.start().await?;
        self.streams_opened += 1;

        let encoder = ChunkEncoder::new(
            &self.preferred_codec,
            self.constraints.sample_rate,
            self.constraints.channels,
        );

        info!(
            "Capture started on '{}' ({} chunks)",
            self.backend.name(),
            encoder.codec().as_str()
        );

        let chunk_task = tokio::spawn(run_chunker(
            frame_rx,
            encoder,
            self.constraints.sample_rate,
            self.chunk_interval_ms,
        ));

        self.active = Some(ActiveCapture { chunk_task });
        Ok(())
    }

    /// Stop capture and return the whole utterance as one payload.
    ///
    /// The device is released before the chunks are collected; chunk
    /// bytes are concatenated in emission order.
    pub async fn stop(&mut self) -> Result<Vec<u8>> {
        let active = self
            .active
            .take()
            .context("Capture not active")?;

        let stop_result = self.backend.stop().await;
        self.streams_closed += 1;
        if let Err(e) = stop_result {
            // The frame channel may still be open; reap the chunker
            // rather than leaving it ticking detached
            active.chunk_task.abort();
            return Err(e).context("Failed to stop capture backend");
        }

        let chunks = active
            .chunk_task
            .await
            .context("Chunk task panicked")?;

        let payload: Vec<u8> = chunks.into_iter().flat_map(|c| c.bytes).collect();

        info!("Capture stopped: {} byte payload", payload.len());
        Ok(payload)
    }

    /// Tear down capture and drop any buffered-but-unsent audio.
    pub async fn discard(&mut self) -> Result<()> {
        if let Some(active) = self.active.take() {
            let stop_result = self.backend.stop().await;
            self.streams_closed += 1;
            active.chunk_task.abort();
            stop_result.context("Failed to stop capture backend")?;
            info!("Capture discarded");
        }
        Ok(())
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Input streams opened so far (leak accounting)
    pub fn streams_opened(&self) -> usize {
        self.streams_opened
    }

    /// Input streams closed so far (leak accounting)
    pub fn streams_closed(&self) -> usize {
        self.streams_closed
    }
}

/// Slice incoming frames into fixed-cadence encoded chunks.
///
/// Runs until the frame channel closes, then flushes the remainder as
/// a final chunk. Chunk order is the emission order.
async fn run_chunker(
    mut frame_rx: mpsc::Receiver<AudioFrame>,
    encoder: ChunkEncoder,
    target_sample_rate: u32,
    chunk_interval_ms: u64,
) -> Vec<AudioChunk> {
    let mut chunks = Vec::new();
    let mut pending: Vec<i16> = Vec::new();

    let interval = std::time::Duration::from_millis(chunk_interval_ms);
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_frame = frame_rx.recv() => match maybe_frame {
                Some(frame) => {
                    pending.extend(downsample(&frame.samples, frame.sample_rate, target_sample_rate));
                }
                None => break,
            },
            _ = ticker.tick() => {
                flush(&encoder, &mut pending, &mut chunks);
            }
        }
    }

    flush(&encoder, &mut pending, &mut chunks);
    chunks
}

fn flush(encoder: &ChunkEncoder, pending: &mut Vec<i16>, chunks: &mut Vec<AudioChunk>) {
    if pending.is_empty() {
        return;
    }

    match encoder.encode(pending) {
        Ok(chunk) => chunks.push(chunk),
        Err(e) => error!("Failed to encode audio chunk: {}", e),
    }

    pending.clear();
}

/// Downsample by decimation (integer ratios only, like the capture
/// devices we target)
fn downsample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate <= to_rate {
        return samples.to_vec();
    }

    let ratio = (from_rate / to_rate).max(1);
    samples.iter().step_by(ratio as usize).copied().collect()
}
