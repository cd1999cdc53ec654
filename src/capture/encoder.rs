use anyhow::{Context, Result};
use std::io::Cursor;
use tracing::warn;

/// Codec identifier carried by every encoded chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCodec {
    /// WAV container with 16-bit PCM payload
    Wav,
    /// Raw little-endian 16-bit PCM, no container
    PcmS16Le,
}

impl ChunkCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkCodec::Wav => "audio/wav",
            ChunkCodec::PcmS16Le => "audio/pcm;s16le",
        }
    }
}

/// One encoded slice of captured audio
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub codec: ChunkCodec,
    pub bytes: Vec<u8>,
}

/// Encodes fixed-cadence sample slices into tagged chunks.
///
/// The preferred codec comes from configuration; an unrecognized name
/// falls back to raw PCM transparently, which does not change the
/// chunk contract.
pub struct ChunkEncoder {
    codec: ChunkCodec,
    sample_rate: u32,
    channels: u16,
}

impl ChunkEncoder {
    pub fn new(preferred_codec: &str, sample_rate: u32, channels: u16) -> Self {
        let codec = match preferred_codec {
            "wav" => ChunkCodec::Wav,
            "pcm" => ChunkCodec::PcmS16Le,
            other => {
                warn!("Codec '{}' not supported, falling back to raw PCM", other);
                ChunkCodec::PcmS16Le
            }
        };

        Self {
            codec,
            sample_rate,
            channels,
        }
    }

    pub fn codec(&self) -> ChunkCodec {
        self.codec
    }

    pub fn encode(&self, samples: &[i16]) -> Result<AudioChunk> {
        let bytes = match self.codec {
            ChunkCodec::Wav => self.encode_wav(samples)?,
            ChunkCodec::PcmS16Le => samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        };

        Ok(AudioChunk {
            codec: self.codec,
            bytes,
        })
    }

    fn encode_wav(&self, samples: &[i16]) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .context("Failed to create WAV chunk writer")?;

            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV chunk")?;
            }

            writer
                .finalize()
                .context("Failed to finalize WAV chunk")?;
        }

        Ok(cursor.into_inner())
    }
}
