//! Lifecycle and message extension points.

use wsnotify_core::Error;

/// Callbacks invoked synchronously on the transport thread.
///
/// Every method defaults to a no-op. Queueing and metrics happen whether or
/// not a hook is implemented, so hooks are purely observational. Keep them
/// short: a slow hook delays delivery of every later message.
pub trait NotificationHooks<T>: Send + Sync {
    /// The handshake completed.
    fn on_connect(&self) {}

    /// A notification was decoded and queued.
    fn on_notification(&self, _notification: &T) {}

    /// The transport closed with the given close code and reason.
    fn on_disconnect(&self, _code: u16, _reason: &str) {}

    /// A payload failed to decode or the transport reported a fault.
    fn on_error(&self, _error: &Error) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<T> NotificationHooks<T> for NoHooks {}
