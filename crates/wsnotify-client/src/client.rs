//! Connection manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, bounded};
use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use wsnotify_core::poll::{self, PollSettings};
use wsnotify_core::{
    ClientConfig, ConnectionState, Error, Metrics, MetricsSnapshot, NotificationQueue, PollTimeout,
    Result,
};

use crate::connection::Connection;
use crate::hooks::{NoHooks, NotificationHooks};
use crate::pipeline::Pipeline;

/// Longest single dequeue while waiting for a notification.
const NOTIFICATION_SLICE: Duration = Duration::from_millis(100);

/// A WebSocket client that decodes pushed messages into `T` and buffers them.
///
/// All methods take `&self`; share the client between setup, test body and
/// teardown threads with an `Arc`. Connect and disconnect are serialized by
/// one lock that guards only the connection slot. Consumers never touch that
/// lock: they read from a lock-free queue.
pub struct NotificationClient<T> {
    config: ClientConfig,
    slot: Mutex<Option<Connection>>,
    connecting: AtomicBool,
    queue: Arc<NotificationQueue<T>>,
    metrics: Arc<Metrics>,
    pipeline: Pipeline<T>,
}

impl<T> NotificationClient<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    pub fn new(config: ClientConfig) -> Self {
        Self::with_hooks(config, NoHooks)
    }

    pub fn with_hooks(config: ClientConfig, hooks: impl NotificationHooks<T> + 'static) -> Self {
        let queue = Arc::new(NotificationQueue::new());
        let metrics = Arc::new(Metrics::new());
        let pipeline = Pipeline::new(Arc::clone(&queue), Arc::clone(&metrics), Arc::new(hooks));
        Self {
            config,
            slot: Mutex::new(None),
            connecting: AtomicBool::new(false),
            queue,
            metrics,
            pipeline,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the connection, blocking until the handshake completes.
    ///
    /// Returns immediately if already connected. Fails with
    /// [`Error::ConnectionTimeout`] when the handshake does not finish within
    /// the configured connect timeout; the client is then disconnected and
    /// `connect` may be retried.
    pub fn connect(&self) -> Result<()> {
        let request = self.request()?;

        let (connection, error) = {
            let mut slot = self.lock();
            if slot.as_ref().is_some_and(Connection::is_open) {
                return Ok(());
            }
            if let Some(mut stale) = slot.take() {
                tracing::debug!("closing stale connection");
                stale.shutdown();
            }

            self.connecting.store(true, Ordering::Release);
            let attempt = self.open(request);
            self.connecting.store(false, Ordering::Release);

            match attempt {
                Ok(connection) => {
                    *slot = Some(connection);
                    tracing::info!(uri = %self.config.uri, "connected");
                    return Ok(());
                }
                Err(failed) => failed,
            }
        };

        // Joined outside the lock: the session thread may be inside a hook
        // that queries the client.
        if let Some(connection) = connection {
            connection.close();
        }
        Err(error)
    }

    /// Spawn a session and wait on its open gate. On failure the half-open
    /// session, if any, is returned for closing.
    fn open(
        &self,
        request: Request,
    ) -> std::result::Result<Connection, (Option<Connection>, Error)> {
        let timeout = self.config.connect_timeout;
        let (gate, opened) = bounded(1);
        let mut connection = Connection::spawn(
            request,
            self.pipeline.clone(),
            gate,
            self.config.close_timeout,
        )
        .map_err(|err| (None, err))?;

        let outcome = match opened.recv_timeout(timeout) {
            Ok(Ok(())) => return Ok(connection),
            Ok(Err(err)) => err,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(uri = %self.config.uri, ?timeout, "websocket connection timeout");
                Error::ConnectionTimeout {
                    uri: self.config.uri.clone(),
                    timeout,
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                Error::transport("transport exited before the handshake completed")
            }
        };
        connection.shutdown();
        Err((Some(connection), outcome))
    }

    fn request(&self) -> Result<Request> {
        self.config
            .uri
            .as_str()
            .into_client_request()
            .map_err(|err| Error::InvalidUri {
                uri: self.config.uri.clone(),
                reason: err.to_string(),
            })
    }

    /// Close the connection. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        let connection = self.lock().take();
        if let Some(connection) = connection {
            connection.close();
            tracing::info!(uri = %self.config.uri, "disconnected");
        }
    }

    /// Drop the current connection and connect again, retrying up to the
    /// configured number of attempts.
    pub fn reconnect(&self) -> Result<()> {
        self.disconnect();
        let attempts = self.config.reconnect_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.connect() {
                Ok(()) => return Ok(()),
                Err(err @ Error::InvalidUri { .. }) => return Err(err),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    tracing::warn!(attempt, attempts, %err, "reconnect attempt failed");
                    thread::sleep(self.config.reconnect_delay);
                    attempt += 1;
                }
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().as_ref().is_some_and(Connection::is_open)
    }

    pub fn state(&self) -> ConnectionState {
        if self.connecting.load(Ordering::Acquire) {
            ConnectionState::Connecting
        } else if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Wait up to `timeout` for the next notification.
    ///
    /// Returns `None` if nothing arrived in time; that is not an error.
    pub fn wait_for_notification(&self, timeout: Duration) -> Option<T> {
        self.poll_notification(timeout).ok()
    }

    /// Like [`wait_for_notification`](Self::wait_for_notification), but an
    /// empty wait is a [`Error::PollTimeout`].
    pub fn expect_notification(&self, timeout: Duration) -> Result<T> {
        Ok(self.poll_notification(timeout)?)
    }

    /// [`expect_notification`](Self::expect_notification) with the configured
    /// notification timeout.
    pub fn next_notification(&self) -> Result<T> {
        self.expect_notification(self.config.notification_timeout)
    }

    /// Receive exactly `count` notifications, allowing `timeout` for each.
    pub fn collect_notifications(&self, count: usize, timeout: Duration) -> Result<Vec<T>> {
        let mut received = Vec::with_capacity(count);
        while received.len() < count {
            match self.expect_notification(timeout) {
                Ok(notification) => received.push(notification),
                Err(err) => {
                    tracing::warn!(
                        received = received.len(),
                        expected = count,
                        "notifications missing"
                    );
                    return Err(err);
                }
            }
        }
        Ok(received)
    }

    fn poll_notification(&self, timeout: Duration) -> std::result::Result<T, PollTimeout> {
        let deadline = Instant::now() + timeout;
        poll::wait_for_some(
            || {
                let remaining = deadline.saturating_duration_since(Instant::now());
                self.queue.dequeue(remaining.min(NOTIFICATION_SLICE))
            },
            timeout,
            Duration::ZERO,
        )
    }

    /// Drain the queue until a sample finds it already empty.
    ///
    /// Used after connecting to discard anything the server replays before
    /// the test starts producing traffic.
    pub fn wait_for_quiet_queue(&self, settings: PollSettings) -> Result<()> {
        poll::wait_with(
            || {
                let size = self.queue.len();
                self.queue.clear();
                size
            },
            |size| *size == 0,
            settings,
        )?;
        Ok(())
    }

    /// Discard queued notifications. Returns how many were dropped.
    pub fn clear_notifications(&self) -> usize {
        self.queue.clear()
    }

    /// Zero both counters and clear the queue.
    ///
    /// A notification arriving while this runs may or may not survive.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
        self.queue.clear();
    }

    pub fn messages_received_count(&self) -> u64 {
        self.metrics.messages_received.get()
    }

    pub fn errors_count(&self) -> u64 {
        self.metrics.errors.get()
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<T> NotificationClient<T> {
    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Drop for NotificationClient<T> {
    fn drop(&mut self) {
        if let Some(connection) = self.lock().take() {
            connection.close();
        }
    }
}
