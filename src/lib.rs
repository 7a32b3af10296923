//! Gomoku over TCP (workspace facade crate).
//!
//! Re-exports the workspace crates under short names so binaries, tests and
//! benches can use `gomoku_net::{core,adapter,engine,types}` while the
//! implementation lives in dedicated crates under `crates/`.

pub use gomoku_net_adapter as adapter;
pub use gomoku_net_core as core;
pub use gomoku_net_engine as engine;
pub use gomoku_net_types as types;
