use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL for the auth and history collaborators
    /// (e.g. "http://localhost:5000")
    pub base_url: String,
    /// Websocket URL for the streaming protocol
    /// (e.g. "ws://localhost:5000/stream")
    pub socket_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Cadence of encoded chunk emission during capture
    pub chunk_interval_ms: u64,
    /// Codec name for encoded chunks ("wav" or "pcm"); unknown names
    /// fall back to raw PCM
    pub preferred_codec: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Maximum reconnect attempts after an unexpected drop
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_interval_ms: 1000,
            preferred_codec: "wav".to_string(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
        }
    }
}
