//! In-process WebSocket server and todo notification types for tests.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing_subscriber::EnvFilter;
use wsnotify_client::ClientConfig;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoData {
    pub id: u64,
    pub text: String,
    pub completed: bool,
}

/// Notifications pushed by the todo service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TodoNotification {
    NewTodo(TodoData),
}

impl TodoNotification {
    pub fn id(&self) -> u64 {
        match self {
            Self::NewTodo(data) => data.id,
        }
    }
}

pub fn new_todo(id: u64) -> String {
    serde_json::to_string(&TodoNotification::NewTodo(TodoData {
        id,
        text: format!("todo {id}"),
        completed: false,
    }))
    .unwrap()
}

pub fn config_for(uri: impl Into<String>) -> ClientConfig {
    ClientConfig::new(uri)
        .with_connect_timeout(Duration::from_secs(2))
        .with_close_timeout(Duration::from_millis(500))
        .with_reconnect(3, Duration::from_millis(50))
}

#[derive(Debug, Clone)]
enum Outbound {
    Text(String),
    Close,
}

/// A WebSocket server that broadcasts whatever the test tells it to.
pub struct TestServer {
    addr: SocketAddr,
    outbound: broadcast::Sender<Outbound>,
    handshakes: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    runtime: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let addr = listener.local_addr().unwrap();
        let (outbound, _) = broadcast::channel(1024);
        let handshakes = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));

        runtime.spawn(accept_loop(
            listener,
            outbound.clone(),
            Arc::clone(&handshakes),
            Arc::clone(&live),
        ));

        Self {
            addr,
            outbound,
            handshakes,
            live,
            runtime,
        }
    }

    pub fn uri(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.outbound.send(Outbound::Text(text.into()));
    }

    /// Close every connection from the server side.
    pub fn close_all(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }

    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

async fn accept_loop(
    listener: TcpListener,
    outbound: broadcast::Sender<Outbound>,
    handshakes: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
) {
    while let Ok((stream, _)) = listener.accept().await {
        // Subscribe before the handshake so nothing sent after `connect`
        // returns can be missed.
        let rx = outbound.subscribe();
        let handshakes = Arc::clone(&handshakes);
        let live = Arc::clone(&live);
        tokio::spawn(async move {
            if let Err(e) = serve(stream, rx, &handshakes, &live).await {
                tracing::debug!("test connection ended: {}", e);
            }
        });
    }
}

async fn serve(
    stream: TcpStream,
    mut rx: broadcast::Receiver<Outbound>,
    handshakes: &AtomicUsize,
    live: &AtomicUsize,
) -> anyhow::Result<()> {
    // Counted before the upgrade response goes out, so a client whose
    // `connect` returned is always visible in the counters.
    let count = |_req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        handshakes.fetch_add(1, Ordering::SeqCst);
        live.fetch_add(1, Ordering::SeqCst);
        Ok(resp)
    };
    let ws = tokio_tungstenite::accept_hdr_async(stream, count).await?;
    let (mut sink, mut stream) = ws.split();

    let result = async {
        loop {
            tokio::select! {
                out = rx.recv() => match out {
                    Ok(Outbound::Text(text)) => sink.send(Message::Text(text.into())).await?,
                    Ok(Outbound::Close) => sink.send(Message::Close(None)).await?,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                },
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    live.fetch_sub(1, Ordering::SeqCst);
    result
}

/// An endpoint that accepts TCP connections but never answers the upgrade.
pub struct SilentEndpoint {
    listener: StdTcpListener,
}

impl SilentEndpoint {
    pub fn bind() -> Self {
        Self {
            listener: StdTcpListener::bind("127.0.0.1:0").unwrap(),
        }
    }

    pub fn uri(&self) -> String {
        format!("ws://{}/ws", self.listener.local_addr().unwrap())
    }
}

/// A URI on which nothing is listening.
pub fn refused_uri() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/ws")
}
