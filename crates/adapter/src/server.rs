//! Endpoints: listen for the single client as host, or connect as client

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::types::DEFAULT_PORT;

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    pub host: String,
    pub port: u16,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl NetConfig {
    /// Read `GOMOKU_HOST` / `GOMOKU_PORT`, falling back to the defaults.
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("GOMOKU_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env::var("GOMOKU_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { host, port }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
    }
}

/// Bind and wait for exactly one peer.
///
/// `ready_tx` receives the bound address before accepting, which lets tests
/// bind port 0.
pub async fn accept_one(
    config: &NetConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<TcpStream> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    let bound = listener.local_addr()?;
    tracing::info!(%bound, "waiting for a peer");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let (stream, peer) = listener.accept().await?;
    tracing::info!(%peer, "peer connected");
    Ok(stream)
}

pub async fn connect(addr: SocketAddr) -> anyhow::Result<TcpStream> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("connect to {addr}"))?;
    tracing::info!(peer = %addr, "connected to host");
    Ok(stream)
}
