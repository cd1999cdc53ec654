pub mod auth;
pub mod capture;
pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod session;

pub use auth::{AuthClient, SessionIdentity};
pub use capture::{
    AudioChunk, AudioFrame, CaptureBackend, CaptureConstraints, CaptureController, ChunkCodec,
    ChunkEncoder, CpalBackend,
};
pub use config::Config;
pub use connection::{ClientEvent, ConnectOptions, ConnectionState, ServerEvent, SessionConnection};
pub use error::SessionError;
pub use history::{HistoryEntry, HistoryStore, HistorySynchronizer, RestHistoryStore};
pub use session::{LanguageSet, Phase, SessionManager, Utterance};
