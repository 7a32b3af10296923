//! One live TCP link to the peer
//!
//! A connection owns two tasks. The send task drains a FIFO of frames and
//! writes them in order. The receive task reads two-line frames and hands
//! each one to the [`Dispatcher`] before reading the next, so inbound frames
//! are processed strictly in arrival order.
//!
//! Any read or write failure (including the peer closing the socket) fires
//! the connection-lost signal, at most once per connection. A frame with a
//! line that is not UTF-8 or longer than [`MAX_LINE_BYTES`] is dropped and
//! the link stays up.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::protocol::{Frame, Outbound};

/// Longest inbound line kept, newline excluded
pub const MAX_LINE_BYTES: usize = 4096;

/// Why the link dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LostReason {
    /// The peer closed its side
    PeerClosed,
    ReadFailed(std::io::ErrorKind),
    WriteFailed(std::io::ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLost {
    pub peer: SocketAddr,
    pub reason: LostReason,
}

/// Fires once, whichever task notices the failure first.
struct LostSignal {
    peer: SocketAddr,
    tx: Mutex<Option<oneshot::Sender<ConnectionLost>>>,
}

impl LostSignal {
    fn fire(&self, reason: LostReason) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            tracing::warn!(peer = %self.peer, ?reason, "connection lost");
            let _ = tx.send(ConnectionLost {
                peer: self.peer,
                reason,
            });
        }
    }
}

pub struct Connection {
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    out_tx: mpsc::UnboundedSender<Frame>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    send_task: Option<JoinHandle<WriteHalf<TcpStream>>>,
    recv_task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start the send and receive tasks on `stream`.
    ///
    /// The returned receiver resolves with [`ConnectionLost`] on the first
    /// I/O failure. It resolves with an error instead if the connection is
    /// disposed first.
    pub fn spawn(
        stream: TcpStream,
        dispatcher: Arc<Dispatcher>,
    ) -> std::io::Result<(Self, oneshot::Receiver<ConnectionLost>)> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;

        let (lost_tx, lost_rx) = oneshot::channel();
        let lost = Arc::new(LostSignal {
            peer,
            tx: Mutex::new(Some(lost_tx)),
        });

        let (reader, writer) = tokio::io::split(stream);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Frame>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let send_task = tokio::spawn(send_loop(writer, out_rx, shutdown_rx, Arc::clone(&lost)));
        let recv_task = tokio::spawn(recv_loop(reader, Arc::clone(&dispatcher), lost));

        tracing::info!(%peer, "connection established");

        Ok((
            Self {
                peer,
                dispatcher,
                out_tx,
                shutdown_tx: Some(shutdown_tx),
                send_task: Some(send_task),
                recv_task: Some(recv_task),
            },
            lost_rx,
        ))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Queue `message` for the peer if a handler assembles it on this side.
    ///
    /// Returns whether a frame was queued.
    pub fn send(&self, message: &Outbound) -> bool {
        match self.dispatcher.assemble(message) {
            Some(frame) => self.send_frame(frame),
            None => false,
        }
    }

    /// Queue an already built frame.
    pub fn send_frame(&self, frame: Frame) -> bool {
        self.out_tx.send(frame).is_ok()
    }

    /// Stop both tasks and close the socket.
    ///
    /// At most one more queued frame is written before the write side shuts
    /// down. Does not fire the connection-lost signal.
    pub async fn dispose(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.send_task.take() {
            if let Ok(mut writer) = task.await {
                let _ = writer.shutdown().await;
            }
        }
        if let Some(task) = self.recv_task.take() {
            task.abort();
            let _ = task.await;
        }
        tracing::info!(peer = %self.peer, "connection disposed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.recv_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish()
    }
}

async fn write_frame(
    writer: &mut WriteHalf<TcpStream>,
    frame: &Frame,
    buf: &mut Vec<u8>,
) -> std::io::Result<()> {
    buf.clear();
    frame.encode_into(buf);
    writer.write_all(buf).await?;
    writer.flush().await
}

async fn send_loop(
    mut writer: WriteHalf<TcpStream>,
    mut rx: mpsc::UnboundedReceiver<Frame>,
    mut shutdown: oneshot::Receiver<()>,
    lost: Arc<LostSignal>,
) -> WriteHalf<TcpStream> {
    let mut buf: Vec<u8> = Vec::with_capacity(128);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                if let Ok(frame) = rx.try_recv() {
                    let _ = write_frame(&mut writer, &frame, &mut buf).await;
                }
                break;
            }
            next = rx.recv() => {
                let Some(frame) = next else { break };
                tracing::trace!(code = frame.code(), "frame out");
                if let Err(e) = write_frame(&mut writer, &frame, &mut buf).await {
                    lost.fire(LostReason::WriteFailed(e.kind()));
                    break;
                }
            }
        }
    }
    writer
}

enum Line {
    Eof,
    Text(String),
    /// Oversized or not UTF-8; the bytes were consumed
    Dropped,
}

/// Read up to and including the next `\n`, keeping at most
/// [`MAX_LINE_BYTES`].
async fn read_line(
    reader: &mut BufReader<ReadHalf<TcpStream>>,
    buf: &mut Vec<u8>,
) -> std::io::Result<Line> {
    buf.clear();
    let mut oversized = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(Line::Eof);
        }
        let (complete, used) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (true, i + 1),
            None => (false, available.len()),
        };
        if !oversized {
            buf.extend_from_slice(&available[..used]);
            if buf.len() > MAX_LINE_BYTES + 1 {
                oversized = true;
                buf.clear();
            }
        }
        reader.consume(used);
        if complete {
            break;
        }
    }

    if oversized {
        tracing::debug!(limit = MAX_LINE_BYTES, "oversized line dropped");
        return Ok(Line::Dropped);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    match std::str::from_utf8(buf) {
        Ok(text) => Ok(Line::Text(text.to_owned())),
        Err(e) => {
            tracing::debug!(error = %e, "non UTF-8 line dropped");
            Ok(Line::Dropped)
        }
    }
}

enum Inbound {
    Closed,
    Frame(String),
    Dropped,
}

/// Read one two-line frame. A dropped line still takes its slot, so the
/// frame after it lines up.
async fn read_frame(
    reader: &mut BufReader<ReadHalf<TcpStream>>,
    buf: &mut Vec<u8>,
) -> std::io::Result<Inbound> {
    let code = loop {
        match read_line(reader, buf).await? {
            Line::Eof => return Ok(Inbound::Closed),
            // Stray blank lines between frames carry nothing.
            Line::Text(text) if text.trim().is_empty() => continue,
            Line::Text(text) => break Some(text),
            Line::Dropped => break None,
        }
    };
    let body = match read_line(reader, buf).await? {
        Line::Eof => return Ok(Inbound::Closed),
        Line::Text(text) => Some(text),
        Line::Dropped => None,
    };
    Ok(match (code, body) {
        (Some(code), Some(body)) => Inbound::Frame(format!("{code}\n{body}")),
        _ => Inbound::Dropped,
    })
}

async fn recv_loop(
    reader: ReadHalf<TcpStream>,
    dispatcher: Arc<Dispatcher>,
    lost: Arc<LostSignal>,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(128);
    loop {
        match read_frame(&mut reader, &mut buf).await {
            Ok(Inbound::Frame(raw)) => {
                tracing::trace!(frame = %raw.escape_debug(), "frame in");
                dispatcher.dispatch(&raw);
            }
            Ok(Inbound::Dropped) => {}
            Ok(Inbound::Closed) => {
                lost.fire(LostReason::PeerClosed);
                break;
            }
            Err(e) => {
                lost.fire(LostReason::ReadFailed(e.kind()));
                break;
            }
        }
    }
}
