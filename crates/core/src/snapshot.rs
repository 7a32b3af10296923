use std::collections::HashMap;

use crate::arbiter::Phase;
use crate::board::Board;
use crate::types::{BoardSize, Coordinate, Symbol, WinResult};

/// Point-in-time copy of a game, safe to hand to other threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub size: BoardSize,
    pub cells: HashMap<Coordinate, Symbol>,
    pub current: Symbol,
    pub winner: Option<WinResult>,
    /// Bumped by the session on every published change.
    pub version: u64,
}

impl GameSnapshot {
    pub fn capture(board: &Board, phase: Phase) -> Self {
        let (current, winner) = match phase {
            Phase::AwaitingMove(s) => (s, None),
            Phase::Won(w) => (w.symbol, Some(w)),
        };
        Self {
            size: board.size(),
            cells: board.iter().collect(),
            current,
            winner,
            version: 0,
        }
    }

    pub fn is_marked(&self, c: Coordinate) -> bool {
        self.cells.contains_key(&c)
    }

    pub fn mark_at(&self, c: Coordinate) -> Option<Symbol> {
        self.cells.get(&c).copied()
    }

    pub fn game_over(&self) -> bool {
        self.winner.is_some()
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self::capture(&Board::default(), Phase::AwaitingMove(Symbol::Cross))
    }
}
