//! Turn ledger - who plays which symbol and whose turn it is

use thiserror::Error;

use crate::types::Symbol;

/// Weak handle to a player owned by the session.
///
/// The ledger never owns players; it only remembers which handle controls
/// which symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("a player is already bound to {0:?}")]
    SymbolAlreadyBound(Symbol),
    #[error("no player is bound to {0:?}")]
    UnknownSymbol(Symbol),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    current: Symbol,
    bindings: [Option<PlayerId>; 2],
}

impl TurnState {
    /// Empty ledger, `Cross` to move
    pub fn new() -> Self {
        Self {
            current: Symbol::Cross,
            bindings: [None, None],
        }
    }

    pub fn current(&self) -> Symbol {
        self.current
    }

    /// Flip the turn and return the new current symbol
    pub fn advance(&mut self) -> Symbol {
        self.current = self.current.other();
        self.current
    }

    pub fn add_player(&mut self, player: PlayerId, symbol: Symbol) -> Result<(), TurnError> {
        let slot = &mut self.bindings[symbol.index()];
        if slot.is_some() {
            return Err(TurnError::SymbolAlreadyBound(symbol));
        }
        *slot = Some(player);
        Ok(())
    }

    /// Unbind the player holding `symbol`, returning it if there was one
    pub fn remove_player(&mut self, symbol: Symbol) -> Option<PlayerId> {
        self.bindings[symbol.index()].take()
    }

    pub fn player_for(&self, symbol: Symbol) -> Result<PlayerId, TurnError> {
        self.bindings[symbol.index()].ok_or(TurnError::UnknownSymbol(symbol))
    }

    pub fn symbol_of(&self, player: PlayerId) -> Option<Symbol> {
        Symbol::ALL
            .into_iter()
            .find(|s| self.bindings[s.index()] == Some(player))
    }

    /// Player whose turn it is, if one is bound
    pub fn current_player(&self) -> Option<PlayerId> {
        self.bindings[self.current.index()]
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}
