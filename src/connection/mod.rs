pub mod client;
pub mod messages;

pub use client::{ConnectOptions, ConnectionState, SessionConnection};
pub use messages::{ClientEvent, ServerEvent};
