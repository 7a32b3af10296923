//! Move arbiter - the turn state machine
//!
//! Consumes move requests, applies them to the board, checks for a win and
//! advances the turn. The arbiter performs no I/O and raises no callbacks: each
//! call returns a [`MoveOutcome`] describing what happened, and the owner
//! (the session actor) turns that into timer restarts, player prompts and
//! network messages.
//!
//! States:
//!
//! ```text
//! AwaitingMove(s) --valid move--> Evaluating --win--> Won(WinResult)   (terminal)
//!                                           \--no win--> AwaitingMove(s.other())
//! ```

use tracing::debug;

use crate::board::Board;
use crate::snapshot::GameSnapshot;
use crate::turn::{PlayerId, TurnError, TurnState};
use crate::types::{Coordinate, Direction, Symbol, WinResult, WIN_RUN_LENGTH};

/// Externally visible phase of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingMove(Symbol),
    Won(WinResult),
}

/// Result of a move request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing changed: wrong turn, unknown player, occupied or out-of-bounds
    /// cell, or the game is already over.
    Ignored,
    /// The cell was marked and the turn passed to `next`.
    Advanced {
        marked: Coordinate,
        symbol: Symbol,
        next: Symbol,
    },
    /// The cell was marked and completed a winning run.
    Won {
        marked: Coordinate,
        result: WinResult,
    },
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, MoveOutcome::Ignored)
    }
}

#[derive(Debug, Clone)]
pub struct MoveArbiter {
    board: Board,
    turn: TurnState,
    winner: Option<WinResult>,
}

impl MoveArbiter {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            turn: TurnState::new(),
            winner: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn current(&self) -> Symbol {
        self.turn.current()
    }

    pub fn phase(&self) -> Phase {
        match self.winner {
            Some(w) => Phase::Won(w),
            None => Phase::AwaitingMove(self.turn.current()),
        }
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Bind both players in one go; on error nothing is bound.
    pub fn add_players(&mut self, cross: PlayerId, nought: PlayerId) -> Result<(), TurnError> {
        let mut turn = self.turn.clone();
        turn.add_player(cross, Symbol::Cross)?;
        turn.add_player(nought, Symbol::Nought)?;
        self.turn = turn;
        Ok(())
    }

    pub fn add_player(&mut self, player: PlayerId, symbol: Symbol) -> Result<(), TurnError> {
        self.turn.add_player(player, symbol)
    }

    pub fn remove_player(&mut self, symbol: Symbol) -> Option<PlayerId> {
        self.turn.remove_player(symbol)
    }

    /// Handle a move request from `player`.
    ///
    /// Requests from a player who is not on turn are dropped silently; they are
    /// expected when a local click races a remote acknowledgment.
    pub fn request_move(&mut self, player: PlayerId, at: Coordinate) -> MoveOutcome {
        let Some(symbol) = self.turn.symbol_of(player) else {
            debug!(%player, "move request from unbound player ignored");
            return MoveOutcome::Ignored;
        };
        self.apply_mark(symbol, at)
    }

    /// Mark `at` with `symbol` if it is that symbol's turn.
    pub fn apply_mark(&mut self, symbol: Symbol, at: Coordinate) -> MoveOutcome {
        if self.winner.is_some() {
            return MoveOutcome::Ignored;
        }
        if symbol != self.turn.current() {
            debug!(?symbol, %at, "off-turn move ignored");
            return MoveOutcome::Ignored;
        }
        if !self.board.mark_if_possible(at, symbol) {
            debug!(?symbol, %at, "cell unavailable");
            return MoveOutcome::Ignored;
        }

        if let Some(result) = find_win(&self.board, at, symbol) {
            self.winner = Some(result);
            return MoveOutcome::Won { marked: at, result };
        }

        let next = self.turn.advance();
        MoveOutcome::Advanced {
            marked: at,
            symbol,
            next,
        }
    }

    /// The current player ran out of time: pass the turn.
    ///
    /// Returns the new current symbol, or `None` once the game is over.
    pub fn time_expired(&mut self) -> Option<Symbol> {
        if self.winner.is_some() {
            return None;
        }
        Some(self.turn.advance())
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.board, self.phase())
    }
}

/// Look for a run of `WIN_RUN_LENGTH` through the freshly marked `at`.
///
/// Directions are tried in [`Direction::ALL`] order and the first complete run
/// is reported; simultaneous lines are not merged.
pub fn find_win(board: &Board, at: Coordinate, symbol: Symbol) -> Option<WinResult> {
    let same = |c: Coordinate| board.is_in_bounds(c) && board.get(c) == Some(symbol);

    Direction::ALL.into_iter().find_map(|direction| {
        let mut start = at;
        while same(start.offset(direction, -1)) {
            start = start.offset(direction, -1);
        }

        let complete = (1..WIN_RUN_LENGTH as i32).all(|i| same(start.offset(direction, i)));
        complete.then_some(WinResult {
            symbol,
            start,
            direction,
        })
    })
}
