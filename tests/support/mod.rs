// Test doubles shared across integration tests.
#![allow(dead_code)]

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use voxlate::capture::{AudioFrame, CaptureBackend, CaptureController};
use voxlate::config::AudioConfig;
use voxlate::connection::ClientEvent;
use voxlate::error::SessionError;
use voxlate::history::{HistoryEntry, HistoryStore, HistorySynchronizer};
use voxlate::session::SessionManager;

/// Capture backend that replays canned frames.
///
/// Frames are queued on `start` and stay buffered until `stop` closes
/// the channel, so tests are deterministic without real timers.
pub struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    fail_start: bool,
    fail_stop: bool,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    frame_tx: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self {
            frames,
            fail_start: false,
            fail_stop: false,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
            frame_tx: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing() -> Self {
        let mut backend = Self::new(Vec::new());
        backend.fail_start = true;
        backend
    }

    pub fn failing_stop(frames: Vec<AudioFrame>) -> Self {
        let mut backend = Self::new(frames);
        backend.fail_stop = true;
        backend
    }

    pub fn start_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.starts)
    }

    pub fn stop_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stops)
    }

    /// Handle on the live frame sender, visible after the backend is
    /// boxed away into a controller.
    pub fn sender_handle(&self) -> Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>> {
        Arc::clone(&self.frame_tx)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, SessionError> {
        if self.fail_start {
            return Err(SessionError::DeviceUnavailable(
                "permission denied".to_string(),
            ));
        }

        self.starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in &self.frames {
            tx.try_send(frame.clone()).expect("frame channel sized to fit");
        }

        *self.frame_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            anyhow::bail!("device busy");
        }

        // Dropping the sender closes the channel; the chunker drains
        // what is buffered and flushes.
        *self.frame_tx.lock().unwrap() = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.frame_tx.lock().unwrap().is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// In-memory history store with scriptable seed data and failure mode.
pub struct MemoryStore {
    seed: Vec<HistoryEntry>,
    saved: Arc<Mutex<Vec<HistoryEntry>>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            seed: Vec::new(),
            saved: Arc::new(Mutex::new(Vec::new())),
            fail_saves: false,
        }
    }

    pub fn with_seed(seed: Vec<HistoryEntry>) -> Self {
        let mut store = Self::new();
        store.seed = seed;
        store
    }

    pub fn failing_saves() -> Self {
        let mut store = Self::new();
        store.fail_saves = true;
        store
    }

    pub fn saved(&self) -> Arc<Mutex<Vec<HistoryEntry>>> {
        Arc::clone(&self.saved)
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryStore {
    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.seed.clone())
    }

    async fn save(&self, entry: &HistoryEntry) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("store unavailable");
        }
        self.saved.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// 100ms of mono 16kHz audio with a constant sample value
pub fn frame(value: i16, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

/// Audio config with raw PCM chunks for byte-exact payload checks
pub fn pcm_audio_config() -> AudioConfig {
    AudioConfig {
        preferred_codec: "pcm".to_string(),
        ..AudioConfig::default()
    }
}

/// Session manager wired to test doubles; returns the outbound event
/// receiver the connection would normally consume.
pub fn test_manager(
    backend: ScriptedBackend,
    store: MemoryStore,
) -> (SessionManager, mpsc::Receiver<ClientEvent>) {
    let audio = pcm_audio_config();
    let capture = CaptureController::with_backend(Box::new(backend), &audio);
    let history = HistorySynchronizer::new(Arc::new(store));
    let (outbound_tx, outbound_rx) = mpsc::channel(8);

    (SessionManager::new(capture, history, outbound_tx), outbound_rx)
}

/// Give spawned persistence tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
