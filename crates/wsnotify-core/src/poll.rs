//! Bounded-timeout polling.
//!
//! One retry loop serves both "wait for the next notification" and ad-hoc
//! convergence checks in tests (e.g. "the queue has settled to zero").

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::PollTimeout;

/// Timeout and retry interval for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSettings {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT, Self::DEFAULT_INTERVAL)
    }
}

/// Evaluate `supplier` until it yields `Some`, and return the inner value.
///
/// The supplier runs at least once. Between attempts the calling thread
/// sleeps for `interval`, clipped so that it never sleeps past the deadline.
/// Once the deadline has passed with nothing yielded, the call fails with
/// [`PollTimeout`].
pub fn wait_for_some<T, S>(
    mut supplier: S,
    timeout: Duration,
    interval: Duration,
) -> Result<T, PollTimeout>
where
    S: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);
        if let Some(value) = supplier() {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(?timeout, attempts, "poll deadline exceeded");
            return Err(PollTimeout { timeout, attempts });
        }

        let pause = interval.min(deadline - now);
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}

/// Evaluate `supplier` until `predicate` accepts its value.
///
/// Same schedule as [`wait_for_some`].
pub fn wait_for<T, S, P>(
    mut supplier: S,
    predicate: P,
    timeout: Duration,
    interval: Duration,
) -> Result<T, PollTimeout>
where
    S: FnMut() -> T,
    P: Fn(&T) -> bool,
{
    wait_for_some(
        || {
            let value = supplier();
            predicate(&value).then_some(value)
        },
        timeout,
        interval,
    )
}

/// [`wait_for`] with a [`PollSettings`] bundle.
pub fn wait_with<T, S, P>(
    supplier: S,
    predicate: P,
    settings: PollSettings,
) -> Result<T, PollTimeout>
where
    S: FnMut() -> T,
    P: Fn(&T) -> bool,
{
    wait_for(supplier, predicate, settings.timeout, settings.interval)
}

/// Wait until `condition` returns true.
pub fn wait_until<C>(mut condition: C, settings: PollSettings) -> Result<(), PollTimeout>
where
    C: FnMut() -> bool,
{
    wait_with(&mut condition, |held| *held, settings).map(|_| ())
}
