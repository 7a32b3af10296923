//! Core game logic module - pure, deterministic, and testable
//!
//! This crate contains the game rules and state with **no I/O**: no sockets,
//! no clocks, no threads. That makes it:
//!
//! - **Deterministic**: the same moves (and bot seed) always produce the same game
//! - **Testable**: every rule is exercised by plain unit tests
//! - **Shareable**: the host, the client and local games all run the same rules
//!
//! # Module Structure
//!
//! - [`board`]: sparse, bounded grid with an atomic "mark if empty" operation
//! - [`turn`]: the turn ledger binding symbols to players
//! - [`arbiter`]: the move state machine and five-in-a-row detection
//! - [`timer`]: host (authoritative) and mirrored per-turn clocks
//! - [`player`]: human / bot / remote-peer player variants
//! - [`bot`]: random-walk move picker and its LCG
//! - [`snapshot`]: cloneable view for best-effort reads from other threads
//!
//! # Example
//!
//! ```
//! use gomoku_net_core::{Board, MoveArbiter, MoveOutcome, PlayerId};
//! use gomoku_net_core::types::{Coordinate, Symbol};
//!
//! let mut game = MoveArbiter::new(Board::default());
//! game.add_players(PlayerId(1), PlayerId(2)).unwrap();
//!
//! let out = game.request_move(PlayerId(1), Coordinate::new(10, 10));
//! assert!(matches!(out, MoveOutcome::Advanced { next: Symbol::Nought, .. }));
//!
//! // Not Cross's turn any more.
//! assert_eq!(game.request_move(PlayerId(1), Coordinate::new(11, 10)), MoveOutcome::Ignored);
//! ```

pub mod arbiter;
pub mod board;
pub mod bot;
pub mod player;
pub mod snapshot;
pub mod timer;
pub mod turn;

pub use gomoku_net_types as types;

pub use arbiter::{find_win, MoveArbiter, MoveOutcome, Phase};
pub use board::{Board, BoardError};
pub use bot::{RandomWalkBot, SimpleRng};
pub use player::{Player, PlayerKind, Prompt};
pub use snapshot::GameSnapshot;
pub use timer::{HostClock, MirroredClock, TimerEvent};
pub use turn::{PlayerId, TurnError, TurnState};
