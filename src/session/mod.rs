//! Transcription session management
//!
//! This module provides the `SessionManager` abstraction that:
//! - enforces the Idle -> Recording -> Processing lifecycle with
//!   at-most-one in-flight utterance
//! - drives the capture controller and forwards the finished payload
//!   over the streaming connection
//! - applies server events under phase guards and hands confirmed
//!   results to the history synchronizer

pub mod languages;
pub mod manager;

pub use languages::LanguageSet;
pub use manager::{Phase, SessionManager, Utterance};
