use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::languages::LanguageSet;
use crate::auth::AuthClient;
use crate::capture::CaptureController;
use crate::config::Config;
use crate::connection::{
    ClientEvent, ConnectOptions, ConnectionState, ServerEvent, SessionConnection,
};
use crate::error::SessionError;
use crate::history::{HistoryEntry, HistorySynchronizer, RestHistoryStore};

const ORIGINAL_PLACEHOLDER: &str = "Your original speech will appear here...";
const TRANSLATED_PLACEHOLDER: &str = "Your translated speech will appear here...";

/// Recording lifecycle phase
///
/// `Idle -> Recording -> Processing -> Idle` is the only cycle; every
/// failure path returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
    Processing,
}

/// Per start/stop cycle metadata; the audio itself is buffered by the
/// capture controller.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub source_lang: String,
    pub target_lang: String,
    pub started_at: DateTime<Utc>,
}

/// Coordinates capture, the streaming connection and history.
///
/// All fields are exclusively owned here: one connection, at most one
/// in-flight utterance. Methods run to completion between guard check
/// and state mutation, so phase transitions need no locking.
pub struct SessionManager {
    phase: Phase,
    status: String,
    original_text: String,
    translated_text: String,
    source_lang: String,
    target_lang: String,
    languages: LanguageSet,
    capture: CaptureController,
    outbound: mpsc::Sender<ClientEvent>,
    connection: Option<SessionConnection>,
    history: HistorySynchronizer,
    utterance: Option<Utterance>,
}

impl SessionManager {
    pub fn new(
        capture: CaptureController,
        history: HistorySynchronizer,
        outbound: mpsc::Sender<ClientEvent>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            status: "Ready to start".to_string(),
            original_text: ORIGINAL_PLACEHOLDER.to_string(),
            translated_text: TRANSLATED_PLACEHOLDER.to_string(),
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
            languages: LanguageSet::default(),
            capture,
            outbound,
            connection: None,
            history,
            utterance: None,
        }
    }

    /// Full session wiring: identity check, history seed, streaming
    /// connect.
    ///
    /// The connection is not attempted when the identity check fails.
    pub async fn establish(
        config: &Config,
        auth: &AuthClient,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>), SessionError> {
        let identity = auth.verify_identity().await?;
        info!(
            "Establishing session for {}",
            identity.user.as_deref().unwrap_or("unknown")
        );

        let store = Arc::new(RestHistoryStore::new(
            auth.http().clone(),
            &config.server.base_url,
        ));
        let mut history = HistorySynchronizer::new(store);
        if let Err(e) = history.load().await {
            warn!("Failed to fetch translation history: {}", e);
        }

        let capture = CaptureController::new(&config.audio);

        let (connection, events) = SessionConnection::connect(ConnectOptions {
            url: config.server.socket_url.clone(),
            cookie: auth.session_cookie(),
            reconnect: config.connection.clone(),
        });

        let outbound = connection.sender();
        let mut manager = Self::new(capture, history, outbound);
        manager.connection = Some(connection);

        Ok((manager, events))
    }

    /// Begin a new utterance.
    ///
    /// Requires a target language and no processing in flight; a busy
    /// session rejects the request rather than queueing it.
    pub async fn start_recording(&mut self) {
        match self.phase {
            Phase::Processing => {
                self.status = "Please wait for the current translation to finish.".to_string();
                return;
            }
            Phase::Recording => {
                warn!("Start requested while already recording");
                return;
            }
            Phase::Idle => {}
        }

        if self.target_lang.is_empty() {
            self.status = "Please select a target language first".to_string();
            return;
        }

        match self.capture.start().await {
            Ok(()) => {
                self.utterance = Some(Utterance {
                    source_lang: self.source_lang.clone(),
                    target_lang: self.target_lang.clone(),
                    started_at: Utc::now(),
                });
                self.phase = Phase::Recording;
                self.status = "Recording...".to_string();
                self.original_text = "Listening...".to_string();
                self.translated_text = "Translating...".to_string();
            }
            Err(e) => {
                warn!("Failed to start recording: {}", e);
                self.status = format!("Error: {}", e);
            }
        }
    }

    /// Finish the utterance and send it as one audio-chunk event.
    ///
    /// An empty capture still sends an empty payload; the server
    /// decides what to do with it.
    pub async fn stop_recording(&mut self) {
        if self.phase != Phase::Recording {
            warn!("Stop requested while not recording");
            return;
        }

        let target_lang = self
            .utterance
            .as_ref()
            .map(|u| u.target_lang.clone())
            .unwrap_or_else(|| self.target_lang.clone());

        match self.capture.stop().await {
            Ok(payload) => {
                self.phase = Phase::Processing;
                self.status = "Translating...".to_string();

                let event = ClientEvent::AudioChunk {
                    audio: base64::engine::general_purpose::STANDARD.encode(payload),
                    target_lang,
                };

                if self.outbound.send(event).await.is_err() {
                    warn!("Connection gone, dropping utterance");
                    self.status = "Disconnected from server".to_string();
                    self.phase = Phase::Idle;
                    self.utterance = None;
                }
            }
            Err(e) => {
                warn!("Failed to stop capture: {}", e);
                self.status = format!("Error: {}", e);
                self.phase = Phase::Idle;
                self.utterance = None;
            }
        }
    }

    /// Apply one server event under the current phase guard.
    pub async fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::AvailableLanguages {
                languages,
                asr_ready,
            } => {
                let mut set = LanguageSet::default();
                set.update(languages);
                info!("Received {} available languages", set.len());

                if self.source_lang.is_empty() {
                    self.source_lang = "en".to_string();
                }
                if self.target_lang.is_empty() {
                    self.target_lang = "es".to_string();
                }

                self.history.set_languages(set.clone());
                self.languages = set;

                self.status = if asr_ready {
                    "Ready to start".to_string()
                } else {
                    "ASR model not ready. Please wait...".to_string()
                };
            }

            ServerEvent::TranscriptionResult {
                success,
                original,
                translated,
            } => {
                if self.phase != Phase::Processing {
                    warn!("Dropping transcription result outside processing phase");
                    return;
                }

                self.phase = Phase::Idle;
                let utterance = self.utterance.take();

                if success {
                    self.original_text = if original.is_empty() {
                        ORIGINAL_PLACEHOLDER.to_string()
                    } else {
                        original.clone()
                    };
                    self.translated_text = if translated.is_empty() {
                        TRANSLATED_PLACEHOLDER.to_string()
                    } else {
                        translated.clone()
                    };
                    self.status = "Processing complete".to_string();

                    // History needs both texts
                    if !original.is_empty() && !translated.is_empty() {
                        let (source_lang, target_lang) = utterance
                            .map(|u| (u.source_lang, u.target_lang))
                            .unwrap_or((self.source_lang.clone(), self.target_lang.clone()));

                        self.history.record(HistoryEntry::new(
                            &source_lang,
                            &target_lang,
                            &original,
                            &translated,
                        ));
                    }
                } else {
                    self.status = format!("Processing failed: {}", original);
                }
            }

            ServerEvent::Error { message } => {
                warn!("Server error: {}", message);
                self.status = format!("Error: {}", message);
                if self.phase == Phase::Processing {
                    self.phase = Phase::Idle;
                    self.utterance = None;
                }
            }

            ServerEvent::Status { msg } => {
                info!("Server status: {}", msg);
            }
        }
    }

    /// Reflect connection-state changes in the user-visible status.
    pub fn note_connection_state(&mut self, state: ConnectionState) {
        self.status = match state {
            ConnectionState::Connecting => "Connecting...".to_string(),
            ConnectionState::Connected => "Connected to server".to_string(),
            ConnectionState::Reconnecting => "Connection error. Retrying...".to_string(),
            ConnectionState::Disconnected => "Disconnected from server".to_string(),
        };
    }

    /// Language selection is fixed for the duration of a recording.
    pub fn set_target_language(&mut self, code: &str) {
        if self.phase == Phase::Recording {
            warn!("Ignoring language change while recording");
            return;
        }
        self.target_lang = code.to_string();
    }

    pub fn set_source_language(&mut self, code: &str) {
        if self.phase == Phase::Recording {
            warn!("Ignoring language change while recording");
            return;
        }
        self.source_lang = code.to_string();
    }

    /// Tear the session down; a recording in flight is discarded, not
    /// sent.
    pub async fn shutdown(&mut self) {
        if self.phase == Phase::Recording {
            if let Err(e) = self.capture.discard().await {
                warn!("Failed to discard capture: {}", e);
            }
        }

        self.phase = Phase::Idle;
        self.utterance = None;

        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn translated_text(&self) -> &str {
        &self.translated_text
    }

    pub fn target_language(&self) -> &str {
        &self.target_lang
    }

    pub fn source_language(&self) -> &str {
        &self.source_lang
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    pub fn history(&self) -> &HistorySynchronizer {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection.as_ref().map(|c| c.state())
    }

    /// Watch channel for connection-state updates, when connected.
    pub fn connection_state_changes(
        &self,
    ) -> Option<tokio::sync::watch::Receiver<ConnectionState>> {
        self.connection.as_ref().map(|c| c.state_changes())
    }
}
