//! Inbound event handling.
//!
//! The transport thread reports everything it observes as a
//! [`TransportEvent`]; [`Pipeline::dispatch`] is the only code that touches
//! the notification queue and the metrics.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use wsnotify_core::{DecodeError, Error, Metrics, NotificationQueue};

use crate::hooks::NotificationHooks;

/// Close code reported when the stream ends without a close frame.
pub(crate) const ABNORMAL_CLOSURE: u16 = 1006;

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// A text frame arrived.
    Text(String),
    /// The transport reported a fault.
    Failed(String),
    /// The session ended.
    Closed { code: u16, reason: String },
}

pub(crate) struct Pipeline<T> {
    queue: Arc<NotificationQueue<T>>,
    metrics: Arc<Metrics>,
    hooks: Arc<dyn NotificationHooks<T>>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            metrics: Arc::clone(&self.metrics),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<T: DeserializeOwned + Clone> Pipeline<T> {
    pub(crate) fn new(
        queue: Arc<NotificationQueue<T>>,
        metrics: Arc<Metrics>,
        hooks: Arc<dyn NotificationHooks<T>>,
    ) -> Self {
        Self { queue, metrics, hooks }
    }

    /// Handle one transport event. Never blocks beyond the hook calls and
    /// never propagates a failure back to the transport.
    pub(crate) fn dispatch(&self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.hooks.on_connect(),
            TransportEvent::Text(raw) => self.on_text(&raw),
            TransportEvent::Failed(message) => {
                self.metrics.errors.increment();
                tracing::error!(%message, "websocket error");
                self.hooks.on_error(&Error::Transport { message });
            }
            TransportEvent::Closed { code, reason } => {
                tracing::debug!(code, %reason, "websocket closed");
                self.hooks.on_disconnect(code, &reason);
            }
        }
    }

    fn on_text(&self, raw: &str) {
        self.metrics.messages_received.increment();
        match serde_json::from_str::<T>(raw) {
            Ok(notification) => {
                self.queue.enqueue(notification.clone());
                self.hooks.on_notification(&notification);
            }
            Err(source) => {
                self.metrics.errors.increment();
                let error = Error::from(DecodeError::new(raw, source));
                tracing::error!(%error, "failed to parse websocket message");
                self.hooks.on_error(&error);
            }
        }
    }
}
