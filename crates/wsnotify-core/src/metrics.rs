//! Delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A resettable monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment and return the new value.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Counters maintained by the message pipeline.
///
/// `messages_received` counts every inbound text message, including ones that
/// fail to decode, so it may exceed the number of queued notifications.
#[derive(Debug, Default)]
pub struct Metrics {
    pub messages_received: Counter,
    pub errors: Counter,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            messages_received: Counter::new(),
            errors: Counter::new(),
        }
    }

    pub fn reset(&self) {
        self.messages_received.reset();
        self.errors.reset();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.get(),
            errors: self.errors.get(),
        }
    }
}

/// Point-in-time copy of [`Metrics`], suitable for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub errors: u64,
}
