//! Player variants
//!
//! A player has one capability, being prompted to move, and one output, a
//! move request. How the request arrives depends on the variant:
//!
//! - `Human`: later, through the session handle (stdin, UI, tests)
//! - `Bot`: immediately, as the return value of [`Player::prompt`]
//! - `RemotePeer`: later, from the network connection

use crate::board::Board;
use crate::bot::RandomWalkBot;
use crate::turn::PlayerId;
use crate::types::Coordinate;

#[derive(Debug, Clone)]
pub enum PlayerKind {
    Human,
    Bot(RandomWalkBot),
    RemotePeer,
}

/// What the owner should do after prompting a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Wait for local input
    AwaitInput,
    /// The player already decided
    Move(Coordinate),
    /// The move will come over the network; nothing to do
    Remote,
}

#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    kind: PlayerKind,
}

impl Player {
    pub fn new(id: PlayerId, kind: PlayerKind) -> Self {
        Self { id, kind }
    }

    pub fn human(id: PlayerId) -> Self {
        Self {
            id,
            kind: PlayerKind::Human,
        }
    }

    pub fn bot(id: PlayerId, seed: u32) -> Self {
        Self {
            id,
            kind: PlayerKind::Bot(RandomWalkBot::new(seed)),
        }
    }

    pub fn remote(id: PlayerId) -> Self {
        Self {
            id,
            kind: PlayerKind::RemotePeer,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn kind(&self) -> &PlayerKind {
        &self.kind
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, PlayerKind::RemotePeer)
    }

    pub fn is_human(&self) -> bool {
        matches!(self.kind, PlayerKind::Human)
    }

    /// It is this player's turn: ask for a move.
    pub fn prompt(&mut self, board: &Board) -> Prompt {
        match &mut self.kind {
            PlayerKind::Human => Prompt::AwaitInput,
            PlayerKind::Bot(bot) => match bot.choose(board) {
                Some(c) => Prompt::Move(c),
                None => Prompt::AwaitInput,
            },
            PlayerKind::RemotePeer => Prompt::Remote,
        }
    }
}
