//! Adapter module - peer-to-peer game link over TCP
//!
//! Two instances play one game over a single TCP connection. The **host**
//! listens (default port 11000), owns the authoritative board and the turn
//! clock. The **client** connects, forwards its own moves and applies only
//! what the host confirms.
//!
//! # Protocol Overview
//!
//! Messages are text frames of exactly two lines:
//!
//! ```text
//! <code>\n
//! <body>\n
//! ```
//!
//! ## Client → Host
//!
//! - **mark** `x,y`: the client's player wants this cell
//! - **quit**: the client leaves
//!
//! ## Host → Client
//!
//! - **mark** `x,y`: the host's player marked this cell
//! - **mark_made_ack** `x y c|n`: the client's move was accepted with this symbol
//! - **time** `hh:mm:ss`: remaining turn time, once per second
//! - **time_passed**: the turn budget ran out and the turn moved on
//! - **quit**: the host leaves
//!
//! # Example Protocol Flow
//!
//! ```text
//! Host   -> Client: mark\n10,10\n
//! Host   -> Client: time\n00:00:09\n
//! Client -> Host:   mark\n11,10\n
//! Host   -> Client: mark_made_ack\n11 10 n\n
//! Client -> Host:   quit\n\n
//! ```
//!
//! # Implementation
//!
//! - [`protocol`]: frame codec and body grammars
//! - [`dispatcher`]: routes codes to [`FrameHandler`]s in both directions
//! - [`connection`]: socket tasks and the connection-lost signal
//! - [`server`]: [`NetConfig`], accepting and connecting

pub mod connection;
pub mod dispatcher;
pub mod protocol;
pub mod server;

pub use gomoku_net_types as types;

pub use connection::{Connection, ConnectionLost, LostReason, MAX_LINE_BYTES};
pub use dispatcher::{DispatchError, Dispatched, Dispatcher, FrameHandler};
pub use protocol::{Frame, MoveAck, Outbound, ProtocolError};
pub use server::{accept_one, connect, NetConfig};
