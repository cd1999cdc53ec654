use thiserror::Error;

/// Failures the session manager can recover from.
///
/// None of these are fatal: every variant is converted into a
/// user-visible status line at the boundary where it is detected, and
/// the session returns to a usable idle state afterwards.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Microphone permission denied or no input device present.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// The identity check failed before the streaming connection was
    /// attempted.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The persistent connection dropped and the bounded reconnect
    /// policy was exhausted.
    #[error("connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },

    /// A non-fatal `error` event surfaced by the server.
    #[error("server error: {0}")]
    Server(String),

    /// The backend produced a result with `success: false`.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}
