mod support;

use std::sync::atomic::Ordering;
use support::{frame, pcm_audio_config, settle, ScriptedBackend};
use voxlate::capture::{CaptureController, ChunkCodec, ChunkEncoder};
use voxlate::config::AudioConfig;

#[test]
fn test_wav_chunks_carry_a_riff_container() {
    let encoder = ChunkEncoder::new("wav", 16000, 1);
    assert_eq!(encoder.codec(), ChunkCodec::Wav);

    let chunk = encoder.encode(&[100, -200, 300]).unwrap();
    assert_eq!(chunk.codec, ChunkCodec::Wav);
    assert_eq!(&chunk.bytes[..4], b"RIFF");
    assert_eq!(&chunk.bytes[8..12], b"WAVE");
}

#[test]
fn test_pcm_chunks_are_little_endian_samples() {
    let encoder = ChunkEncoder::new("pcm", 16000, 1);

    let chunk = encoder.encode(&[100, -200]).unwrap();
    assert_eq!(chunk.codec, ChunkCodec::PcmS16Le);

    let mut expected = Vec::new();
    expected.extend_from_slice(&100i16.to_le_bytes());
    expected.extend_from_slice(&(-200i16).to_le_bytes());
    assert_eq!(chunk.bytes, expected);
}

#[test]
fn test_unsupported_codec_falls_back_to_pcm() {
    // Fallback is transparent: the chunk contract is unchanged, only
    // the codec tag differs.
    let encoder = ChunkEncoder::new("opus", 16000, 1);
    assert_eq!(encoder.codec(), ChunkCodec::PcmS16Le);

    let chunk = encoder.encode(&[1]).unwrap();
    assert_eq!(chunk.codec, ChunkCodec::PcmS16Le);
    assert_eq!(chunk.bytes, 1i16.to_le_bytes());
}

#[tokio::test]
async fn test_payload_preserves_emission_order() {
    let backend = ScriptedBackend::new(vec![frame(1, 0), frame(2, 100), frame(3, 200)]);
    let mut controller = CaptureController::with_backend(Box::new(backend), &pcm_audio_config());

    controller.start().await.unwrap();
    let payload = controller.stop().await.unwrap();

    // 3 frames x 1600 samples x 2 bytes
    assert_eq!(payload.len(), 9600);
    assert_eq!(&payload[..2], &1i16.to_le_bytes());
    assert_eq!(&payload[3200..3202], &2i16.to_le_bytes());
    assert_eq!(&payload[6400..6402], &3i16.to_le_bytes());
}

#[tokio::test]
async fn test_empty_capture_yields_empty_payload() {
    let backend = ScriptedBackend::new(Vec::new());
    let mut controller = CaptureController::with_backend(Box::new(backend), &pcm_audio_config());

    controller.start().await.unwrap();
    let payload = controller.stop().await.unwrap();

    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_repeated_cycles_balance_open_and_close() {
    let backend = ScriptedBackend::new(vec![frame(1, 0)]);
    let mut controller = CaptureController::with_backend(Box::new(backend), &pcm_audio_config());

    for _ in 0..5 {
        controller.start().await.unwrap();
        let _ = controller.stop().await.unwrap();
    }

    assert_eq!(controller.streams_opened(), 5);
    assert_eq!(controller.streams_closed(), 5);
    assert!(!controller.is_capturing());
}

#[tokio::test]
async fn test_discard_releases_the_device() {
    let backend = ScriptedBackend::new(vec![frame(1, 0)]);
    let stops = backend.stop_count();
    let mut controller = CaptureController::with_backend(Box::new(backend), &pcm_audio_config());

    controller.start().await.unwrap();
    controller.discard().await.unwrap();

    assert!(!controller.is_capturing());
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(controller.streams_opened(), controller.streams_closed());
}

#[tokio::test]
async fn test_stop_failure_reaps_the_chunk_task() {
    // The device refuses to close and keeps its frame channel open
    let backend = ScriptedBackend::failing_stop(vec![frame(1, 0)]);
    let sender = backend.sender_handle();
    let mut controller = CaptureController::with_backend(Box::new(backend), &pcm_audio_config());

    controller.start().await.unwrap();
    assert!(controller.stop().await.is_err());
    assert!(!controller.is_capturing());

    // The chunker must not keep running detached: once it is reaped
    // the frame channel has no receiver left
    settle().await;
    let tx = sender.lock().unwrap().clone().expect("sender still live");
    assert!(tx.is_closed());
}

#[tokio::test]
async fn test_stop_without_start_is_an_error() {
    let backend = ScriptedBackend::new(Vec::new());
    let mut controller = CaptureController::with_backend(Box::new(backend), &pcm_audio_config());

    assert!(controller.stop().await.is_err());
}

#[tokio::test]
async fn test_device_failure_opens_no_stream() {
    let backend = ScriptedBackend::failing();
    let mut controller = CaptureController::with_backend(Box::new(backend), &AudioConfig::default());

    assert!(controller.start().await.is_err());
    assert_eq!(controller.streams_opened(), 0);
    assert!(!controller.is_capturing());
}
