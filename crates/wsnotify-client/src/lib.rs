//! Client-side implementation for wsnotify.
//!
//! [`NotificationClient`] keeps one WebSocket connection to a server that
//! pushes JSON notifications, decodes each text frame into a caller-chosen
//! type, and buffers the results until test code asks for them.
//!
//! ```no_run
//! use std::time::Duration;
//! use wsnotify_client::{ClientConfig, NotificationClient, RawEnvelope};
//!
//! let client = NotificationClient::<RawEnvelope>::new(ClientConfig::from_env());
//! client.connect()?;
//! client.reset_metrics();
//! // ... trigger something server-side ...
//! if let Some(notification) = client.wait_for_notification(Duration::from_secs(5)) {
//!     println!("{} {}", notification.kind, notification.data);
//! }
//! client.disconnect();
//! # Ok::<(), wsnotify_client::Error>(())
//! ```

mod client;
mod connection;
mod hooks;
mod pipeline;

pub use client::NotificationClient;
pub use hooks::{NoHooks, NotificationHooks};

pub use wsnotify_core::{
    ClientConfig, ConnectionState, Envelope, Error, MetricsSnapshot, PollSettings, PollTimeout,
    RawEnvelope, Result, poll,
};
