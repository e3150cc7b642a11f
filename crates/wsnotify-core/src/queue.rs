//! Unbounded FIFO hand-off between the transport thread and test code.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};

/// Thread-safe notification queue.
///
/// Enqueue never blocks and never fails: the queue owns both channel halves,
/// so the channel can never be disconnected while the queue is alive.
#[derive(Debug)]
pub struct NotificationQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> NotificationQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn enqueue(&self, notification: T) {
        // Cannot fail: `self.rx` keeps the channel connected.
        let _ = self.tx.send(notification);
    }

    /// Wait up to `timeout` for the next notification.
    ///
    /// Returns `None` when nothing arrived in time.
    pub fn dequeue(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(notification) => Some(notification),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_dequeue(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(notification) => Some(notification),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Discard the notifications queued when the call started.
    ///
    /// Entries enqueued while the clear runs may survive it. Returns the
    /// number of discarded notifications.
    pub fn clear(&self) -> usize {
        let snapshot = self.rx.len();
        let mut discarded = 0;
        while discarded < snapshot && self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Default for NotificationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
