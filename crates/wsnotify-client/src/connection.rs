//! One live WebSocket session.
//!
//! Each session runs on its own thread with a current-thread tokio runtime.
//! That thread is the only producer for the pipeline: it turns frames into
//! [`TransportEvent`]s and hands them to [`Pipeline::dispatch`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use wsnotify_core::{Error, Result};

use crate::pipeline::{ABNORMAL_CLOSURE, Pipeline, TransportEvent};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives the outcome of the handshake. First signal wins.
pub(crate) type OpenGate = Sender<Result<()>>;

const NO_STATUS: u16 = 1005;

/// Handle to a session thread.
///
/// Dropping the handle asks the session to close without waiting for it.
pub(crate) struct Connection {
    open: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Connection {
    pub(crate) fn spawn<T>(
        request: Request,
        pipeline: Pipeline<T>,
        gate: OpenGate,
        close_timeout: Duration,
    ) -> Result<Self>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let open = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = Session {
            open: Arc::clone(&open),
            pipeline,
            gate,
            close_timeout,
        };

        let thread = thread::Builder::new()
            .name("wsnotify-transport".to_string())
            .spawn(move || session.run(request, shutdown_rx))?;

        Ok(Self {
            open,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Whether the transport currently reports itself open.
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Ask the session to close. Non-blocking and idempotent.
    pub(crate) fn shutdown(&mut self) {
        self.open.store(false, Ordering::Release);
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Close the session and wait for its thread to finish.
    ///
    /// The wait is bounded by the close timeout. Called from the session
    /// thread itself (e.g. inside a hook) it only signals.
    pub(crate) fn close(mut self) {
        self.shutdown();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            tracing::warn!("transport thread panicked");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Session<T> {
    open: Arc<AtomicBool>,
    pipeline: Pipeline<T>,
    gate: OpenGate,
    close_timeout: Duration,
}

impl<T> Session<T>
where
    T: DeserializeOwned + Clone,
{
    fn run(self, request: Request, shutdown: oneshot::Receiver<()>) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let error = Error::transport(format!("failed to start runtime: {err}"));
                let _ = self.gate.try_send(Err(error));
                return;
            }
        };
        runtime.block_on(self.drive(request, shutdown));
        self.open.store(false, Ordering::Release);
    }

    async fn drive(&self, request: Request, mut shutdown: oneshot::Receiver<()>) {
        let uri = request.uri().to_string();

        let mut socket = tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!(%uri, "connect abandoned");
                return;
            }
            result = tokio_tungstenite::connect_async(request) => match result {
                Ok((socket, _response)) => socket,
                Err(err) => {
                    let message = err.to_string();
                    // Release the waiting `connect` before any hook runs.
                    let _ = self.gate.try_send(Err(Error::transport(&message)));
                    self.pipeline.dispatch(TransportEvent::Failed(message));
                    return;
                }
            }
        };

        self.open.store(true, Ordering::Release);
        let _ = self.gate.try_send(Ok(()));
        tracing::debug!(%uri, "websocket open");
        self.pipeline.dispatch(TransportEvent::Opened);

        let (code, reason) = loop {
            let frame = tokio::select! {
                _ = &mut shutdown => None,
                frame = socket.next() => Some(frame),
            };
            let Some(frame) = frame else {
                break self.close_gracefully(&mut socket).await;
            };
            match frame {
                Some(Ok(Message::Text(text))) => {
                    self.pipeline.dispatch(TransportEvent::Text(text.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    self.open.store(false, Ordering::Release);
                    // Keep reading so the automatic close reply is flushed.
                    let drain = async { while let Some(Ok(_)) = socket.next().await {} };
                    let _ = tokio::time::timeout(self.close_timeout, drain).await;
                    break close_parts(frame);
                }
                // Binary, ping and pong frames carry no notifications.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    let message = err.to_string();
                    self.pipeline.dispatch(TransportEvent::Failed(message.clone()));
                    break (ABNORMAL_CLOSURE, message);
                }
                None => break (ABNORMAL_CLOSURE, String::new()),
            }
        };

        self.open.store(false, Ordering::Release);
        self.pipeline.dispatch(TransportEvent::Closed { code, reason });
    }

    /// Send a close frame and wait for the peer's reply, up to the close timeout.
    /// Text frames that arrive meanwhile are discarded.
    async fn close_gracefully(&self, socket: &mut Socket) -> (u16, String) {
        let handshake = async {
            socket
                .close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client disconnect".into(),
                }))
                .await?;
            while let Some(frame) = socket.next().await {
                if let Message::Close(frame) = frame? {
                    return Ok(close_parts(frame));
                }
            }
            Ok::<_, WsError>((u16::from(CloseCode::Normal), String::new()))
        };

        match tokio::time::timeout(self.close_timeout, handshake).await {
            Ok(Ok(parts)) => parts,
            Ok(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                (u16::from(CloseCode::Normal), String::new())
            }
            Ok(Err(err)) => {
                tracing::debug!(%err, "close handshake failed");
                (ABNORMAL_CLOSURE, err.to_string())
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.close_timeout, "peer did not acknowledge close");
                (ABNORMAL_CLOSURE, "close timed out".to_string())
            }
        }
    }
}

fn close_parts(frame: Option<CloseFrame>) -> (u16, String) {
    match frame {
        Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
        None => (NO_STATUS, String::new()),
    }
}
