//! Error taxonomy shared by the notification client.

use std::time::Duration;

/// Result alias used throughout wsnotify.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the notification client.
///
/// Only connect-time and explicit-wait failures are ever returned to callers.
/// `Decode` and `Transport` errors raised on the event thread are absorbed by
/// the pipeline and reach collaborators through the `on_error` hook.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection to {uri} timed out after {timeout:?}")]
    ConnectionTimeout { uri: String, timeout: Duration },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error(transparent)]
    PollTimeout(#[from] PollTimeout),
    #[error("invalid websocket uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("failed to spawn transport thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    /// Build a transport error from anything displayable.
    pub fn transport(message: impl ToString) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// True for the two timeout outcomes (connect and explicit waits).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. } | Self::PollTimeout(_))
    }
}

/// An inbound payload that could not be decoded into the notification type.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode notification ({len} bytes): {source}")]
pub struct DecodeError {
    len: usize,
    #[source]
    source: serde_json::Error,
}

impl DecodeError {
    pub fn new(payload: &str, source: serde_json::Error) -> Self {
        Self {
            len: payload.len(),
            source,
        }
    }

    /// Size of the rejected payload in bytes.
    pub fn payload_len(&self) -> usize {
        self.len
    }
}

/// A bounded wait expired before its condition held.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("condition not met within {timeout:?} after {attempts} attempts")]
pub struct PollTimeout {
    pub timeout: Duration,
    pub attempts: u32,
}
