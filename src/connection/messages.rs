use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Events sent client -> server over the streaming connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// One complete utterance, sent exactly once per recording cycle
    AudioChunk {
        /// Base64-encoded audio payload
        audio: String,
        /// Target language code for translation
        target_lang: String,
    },
}

/// Events received server -> client
///
/// Each event is logically independent and may arrive at any time
/// after connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Language set update; `asr_ready` reflects whether the
    /// recognition engine can accept audio yet
    AvailableLanguages {
        /// Display name -> language code
        languages: HashMap<String, String>,
        asr_ready: bool,
    },

    /// Terminal result for the in-flight utterance
    TranscriptionResult {
        success: bool,
        /// Transcribed text on success, error message on failure
        original: String,
        #[serde(default)]
        translated: String,
    },

    /// A non-fatal server-side failure
    Error { message: String },

    /// Informational connect acknowledgement; carries no state
    Status {
        #[serde(default)]
        msg: String,
    },
}
