//! Microphone capture and chunk encoding
//!
//! This module owns the input-device lifecycle for a session:
//! - `CaptureBackend` abstracts the platform microphone (cpal in
//!   production, scripted backends in tests)
//! - `ChunkEncoder` turns fixed-cadence sample slices into tagged,
//!   opaque binary chunks
//! - `CaptureController` coordinates both and produces the single
//!   concatenated payload for an utterance

pub mod backend;
pub mod controller;
pub mod encoder;
pub mod mic;

pub use backend::{AudioFrame, CaptureBackend, CaptureConstraints};
pub use controller::CaptureController;
pub use encoder::{AudioChunk, ChunkCodec, ChunkEncoder};
pub use mic::CpalBackend;
