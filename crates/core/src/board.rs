//! Board module - sparse occupancy grid
//!
//! The board records which cells are marked and with which symbol. Only marked
//! cells are stored, so a 1000x1000 board with a dozen moves costs a dozen
//! entries. Coordinates: (x, y) where x ranges 0..width (left to right), y
//! ranges 0..height (top to bottom).
//!
//! The only mutation during play is [`Board::mark_if_possible`], an atomic
//! check-and-set. [`Board::resize`] is destructive and meant for session setup.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{BoardSize, Coordinate, Symbol, MAX_BOARD_SIDE, MIN_BOARD_SIDE};

/// Board validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error(
        "board size {width}x{height} outside the allowed range {}..={} per side",
        MIN_BOARD_SIDE,
        MAX_BOARD_SIDE
    )]
    SizeOutOfRange { width: u32, height: u32 },
    #[error("cell {0} is not marked")]
    NotMarked(Coordinate),
}

/// The game board
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    size: BoardSize,
    cells: HashMap<Coordinate, Symbol>,
}

impl Board {
    /// Create an empty board, rejecting sizes outside the allowed range
    pub fn new(size: BoardSize) -> Result<Self, BoardError> {
        check_size(size)?;
        Ok(Self {
            size,
            cells: HashMap::new(),
        })
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// Change the board size and clear every mark.
    ///
    /// Clears even when `size` equals the current size. On error the board is
    /// left untouched.
    pub fn resize(&mut self, size: BoardSize) -> Result<(), BoardError> {
        check_size(size)?;
        self.size = size;
        self.cells.clear();
        Ok(())
    }

    /// Check if position is inside the board
    #[inline]
    pub fn is_in_bounds(&self, c: Coordinate) -> bool {
        self.size.contains(c)
    }

    /// Check if position holds a mark
    #[inline]
    pub fn is_marked(&self, c: Coordinate) -> bool {
        self.cells.contains_key(&c)
    }

    /// Symbol at a marked position
    pub fn mark_at(&self, c: Coordinate) -> Result<Symbol, BoardError> {
        self.cells.get(&c).copied().ok_or(BoardError::NotMarked(c))
    }

    /// Symbol at position, `None` when unmarked
    #[inline]
    pub fn get(&self, c: Coordinate) -> Option<Symbol> {
        self.cells.get(&c).copied()
    }

    /// Mark `c` with `symbol` if it is in bounds and unmarked.
    ///
    /// Returns true iff the mark was placed. A refused mark leaves the board
    /// unchanged, including the symbol already on the cell.
    pub fn mark_if_possible(&mut self, c: Coordinate, symbol: Symbol) -> bool {
        if !self.is_in_bounds(c) {
            return false;
        }
        match self.cells.entry(c) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(symbol);
                true
            }
        }
    }

    /// Number of marked cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether every in-bounds cell is marked
    pub fn is_full(&self) -> bool {
        self.cells.len() as u64 >= self.size.width as u64 * self.size.height as u64
    }

    /// Iterate over marked cells in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, Symbol)> + '_ {
        self.cells.iter().map(|(c, s)| (*c, *s))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self {
            size: BoardSize::default(),
            cells: HashMap::new(),
        }
    }
}

fn check_size(size: BoardSize) -> Result<(), BoardError> {
    if size.is_valid() {
        Ok(())
    } else {
        Err(BoardError::SizeOutOfRange {
            width: size.width,
            height: size.height,
        })
    }
}
