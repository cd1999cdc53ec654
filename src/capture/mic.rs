//! Microphone backend on cpal.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated
//! thread for the duration of a capture. The thread forwards frames
//! into a tokio channel and tears the stream down when signalled.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConstraints};
use crate::error::SessionError;

/// Frames buffered between the audio callback and the chunk task
const FRAME_CHANNEL_CAPACITY: usize = 64;

pub struct CpalBackend {
    constraints: CaptureConstraints,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
    join: std::thread::JoinHandle<()>,
}

impl CpalBackend {
    pub fn new(constraints: CaptureConstraints) -> Self {
        Self {
            constraints,
            worker: None,
        }
    }

    fn open_stream(
        constraints: &CaptureConstraints,
        frame_tx: mpsc::Sender<AudioFrame>,
    ) -> Result<cpal::Stream, SessionError> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| SessionError::DeviceUnavailable("no input device".into()))?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown device".to_string());

        let default_config = device
            .default_input_config()
            .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;

        let mut stream_config: StreamConfig = default_config.clone().into();

        // Prefer the target rate when the device supports it; otherwise
        // frames carry the device rate and are downsampled later.
        if let Ok(supported) = device.supported_input_configs() {
            for candidate in supported {
                if candidate.min_sample_rate().0 <= constraints.sample_rate
                    && candidate.max_sample_rate().0 >= constraints.sample_rate
                {
                    stream_config.sample_rate = cpal::SampleRate(constraints.sample_rate);
                    break;
                }
            }
        }

        info!(
            "Opening input device '{}': {} channels, {} Hz",
            device_name, stream_config.channels, stream_config.sample_rate.0
        );

        let channels = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate.0;
        let started = Instant::now();

        let err_fn = |err| warn!("Audio stream error: {}", err);

        let stream = match default_config.sample_format() {
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let samples = downmix_i16(data, channels);
                    deliver(&frame_tx, samples, sample_rate, started);
                },
                err_fn,
                None,
            ),
            _ => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples = downmix_f32(data, channels);
                    deliver(&frame_tx, samples, sample_rate, started);
                },
                err_fn,
                None,
            ),
        }
        .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;

        Ok(stream)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError> {
        if self.worker.is_some() {
            warn!("Capture already active");
            return Err(SessionError::DeviceUnavailable(
                "capture already active".into(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let constraints = self.constraints.clone();

        let join = std::thread::spawn(move || {
            let stream = match Self::open_stream(&constraints, frame_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Park until stop (or backend drop) and release the device.
            let _ = stop_rx.recv();
            drop(stream);
            info!("Input stream released");
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, join });
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => Err(SessionError::DeviceUnavailable(
                "capture thread exited during startup".into(),
            )),
        }
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            tokio::task::spawn_blocking(move || {
                if worker.join.join().is_err() {
                    warn!("Capture thread panicked");
                }
            })
            .await?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

fn deliver(
    frame_tx: &mpsc::Sender<AudioFrame>,
    samples: Vec<i16>,
    sample_rate: u32,
    started: Instant,
) {
    let frame = AudioFrame {
        samples,
        sample_rate,
        channels: 1,
        timestamp_ms: started.elapsed().as_millis() as u64,
    };

    // The audio callback must not block; drop the frame if the chunk
    // task has fallen this far behind.
    if frame_tx.try_send(frame).is_err() {
        warn!("Frame channel full, dropping audio frame");
    }
}

fn downmix_f32(data: &[f32], channels: usize) -> Vec<i16> {
    data.chunks(channels.max(1))
        .map(|frame| {
            let mono: f32 = frame.iter().sum::<f32>() / frame.len() as f32;
            (mono.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect()
}

fn downmix_i16(data: &[i16], channels: usize) -> Vec<i16> {
    data.chunks(channels.max(1))
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}
