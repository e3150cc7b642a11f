//! Core types for wsnotify.
//!
//! This crate provides the transport-independent pieces of a real-time
//! notification client: the hand-off queue, the polling primitive, delivery
//! metrics, configuration and errors. `wsnotify-client` wires them to a
//! WebSocket transport.

mod config;
mod envelope;
mod error;
mod metrics;
pub mod poll;
mod queue;

pub use config::ClientConfig;
pub use envelope::{Envelope, RawEnvelope};
pub use error::{DecodeError, Error, PollTimeout, Result};
pub use metrics::{Counter, Metrics, MetricsSnapshot};
pub use poll::{PollSettings, wait_for, wait_for_some, wait_until};
pub use queue::NotificationQueue;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live transport.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Transport open and delivering.
    Connected,
}
