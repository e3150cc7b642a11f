//! Notification envelopes.
//!
//! Servers push `{"type": ..., "data": {...}}` objects. Collaborators can
//! decode into their own tagged enum (`#[serde(tag = "type")]`) or use
//! [`Envelope`] when the payload shape is all they care about.

use serde::{Deserialize, Serialize};

/// A decoded notification: a `type` discriminator plus its payload.
///
/// Unknown fields on the wire are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<D> {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: D,
}

impl<D> Envelope<D> {
    pub fn new(kind: impl Into<String>, data: D) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Check the discriminator.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// An envelope whose payload is kept as raw JSON.
pub type RawEnvelope = Envelope<serde_json::Value>;
