//! Session engine - runs one game for a local, host or client role
//!
//! Glues the pure rules in `gomoku-net-core` to the wire in
//! `gomoku-net-adapter`. The entry points are the [`Session`] constructors,
//! each returning a [`SessionHandle`] for commands and reads plus a stream
//! of [`SessionEvent`]s.
//!
//! ```no_run
//! use gomoku_net_engine::{Session, SessionConfig, SessionEvent};
//! use gomoku_net_engine::core::PlayerKind;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let (handle, mut events) =
//!     Session::local(&SessionConfig::default(), PlayerKind::Human, PlayerKind::Human)?;
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::AwaitingInput(_) = event {
//!         handle.quit();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod handlers;
pub mod host_timer;
pub mod session;

pub use gomoku_net_adapter as adapter;
pub use gomoku_net_core as core;
pub use gomoku_net_types as types;

pub use config::SessionConfig;
pub use handlers::{MoveAckHandler, ProtocolHandlers, RemotePeerHandler, Side, TimerSyncHandler};
pub use host_timer::{HostTimer, TimerControl};
pub use session::{Role, Session, SessionCommand, SessionEvent, SessionEvents, SessionHandle};
