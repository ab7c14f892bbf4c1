// spoolsync-api: Async Rust client for the Bambu/Spoolman bridge service

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::BridgeClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
