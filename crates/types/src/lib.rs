//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are plain values with no I/O, usable from the game core, the
//! network adapter, and the session engine alike.
//!
//! # Board Dimensions
//!
//! The board is sparse and conceptually unbounded, but every session plays on
//! a bounded rectangle:
//!
//! - **Side length**: between 50 and 1000 cells per axis
//! - **Default**: 100 x 100
//! - **Coordinates**: `(x, y)` with `0 <= x < width`, `0 <= y < height`
//!
//! # Game Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `WIN_RUN_LENGTH` | 5 | Marks in a row needed to win |
//! | `DEFAULT_MOVE_TIME_SECS` | 10 | Per-turn time budget |
//! | `TIMER_PERIOD_MS` | 1000 | Host timer period |
//! | `DEFAULT_PORT` | 11000 | TCP port a host listens on |
//!
//! # Examples
//!
//! ```
//! use gomoku_net_types::{Coordinate, Direction, Symbol, WinResult};
//!
//! assert_eq!(Symbol::Cross.other(), Symbol::Nought);
//! assert_eq!(Symbol::from_wire_char('n'), Some(Symbol::Nought));
//!
//! let win = WinResult {
//!     symbol: Symbol::Cross,
//!     start: Coordinate::new(0, 0),
//!     direction: Direction::Horizontal,
//! };
//! assert_eq!(win.cells().last(), Some(&Coordinate::new(4, 0)));
//! ```

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// Smallest allowed board side (per axis)
pub const MIN_BOARD_SIDE: u32 = 50;

/// Largest allowed board side (per axis)
pub const MAX_BOARD_SIDE: u32 = 1000;

/// Default board side used when nothing else is configured
pub const DEFAULT_BOARD_SIDE: u32 = 100;

/// Number of consecutive marks that wins the game
pub const WIN_RUN_LENGTH: usize = 5;

/// Default per-turn time budget in seconds
pub const DEFAULT_MOVE_TIME_SECS: u32 = 10;

/// Period of the authoritative timer in milliseconds
pub const TIMER_PERIOD_MS: u64 = 1000;

/// Default TCP port for host sessions
pub const DEFAULT_PORT: u16 = 11000;

/// One of the two marks a cell can hold.
///
/// `Cross` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Cross,
    Nought,
}

impl Symbol {
    /// Both symbols, in turn order
    pub const ALL: [Symbol; 2] = [Symbol::Cross, Symbol::Nought];

    /// The opposing symbol
    pub fn other(self) -> Self {
        match self {
            Symbol::Cross => Symbol::Nought,
            Symbol::Nought => Symbol::Cross,
        }
    }

    /// Single-letter wire form (`c` or `n`)
    pub fn wire_char(self) -> char {
        match self {
            Symbol::Cross => 'c',
            Symbol::Nought => 'n',
        }
    }

    /// Parse the single-letter wire form
    ///
    /// ```
    /// use gomoku_net_types::Symbol;
    ///
    /// assert_eq!(Symbol::from_wire_char('c'), Some(Symbol::Cross));
    /// assert_eq!(Symbol::from_wire_char('x'), None);
    /// ```
    pub fn from_wire_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Symbol::Cross),
            'n' => Some(Symbol::Nought),
            _ => None,
        }
    }

    /// Stable array index (`Cross` = 0, `Nought` = 1)
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Symbol::Cross => 0,
            Symbol::Nought => 1,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Cross => write!(f, "X"),
            Symbol::Nought => write!(f, "O"),
        }
    }
}

/// Integer cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move `steps` times along `direction` (negative steps walk backward)
    #[inline]
    pub fn offset(self, direction: Direction, steps: i32) -> Self {
        let (dx, dy) = direction.step();
        Self {
            x: self.x.wrapping_add(dx.wrapping_mul(steps)),
            y: self.y.wrapping_add(dy.wrapping_mul(steps)),
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Board dimensions in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardSize {
    pub width: u32,
    pub height: u32,
}

impl BoardSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether both sides lie within `[MIN_BOARD_SIDE, MAX_BOARD_SIDE]`
    pub fn is_valid(&self) -> bool {
        (MIN_BOARD_SIDE..=MAX_BOARD_SIDE).contains(&self.width)
            && (MIN_BOARD_SIDE..=MAX_BOARD_SIDE).contains(&self.height)
    }

    /// Whether `c` lies inside a board of this size
    #[inline]
    pub fn contains(&self, c: Coordinate) -> bool {
        c.x >= 0
            && (c.x as i64) < self.width as i64
            && c.y >= 0
            && (c.y as i64) < self.height as i64
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIDE, DEFAULT_BOARD_SIDE)
    }
}

/// Direction of a winning run.
///
/// The declaration order is the order in which win detection checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Left to right
    Horizontal,
    /// Top-left to bottom-right
    Diagonal,
    /// Top to bottom
    Vertical,
    /// Top-right to bottom-left
    AntiDiagonal,
}

impl Direction {
    /// Fixed enumeration order used by win detection
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Diagonal,
        Direction::Vertical,
        Direction::AntiDiagonal,
    ];

    /// Coordinate change per step along this direction
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::Horizontal => (1, 0),
            Direction::Diagonal => (1, 1),
            Direction::Vertical => (0, 1),
            Direction::AntiDiagonal => (-1, 1),
        }
    }
}

/// A detected win: who, where the run starts, and which way it goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinResult {
    pub symbol: Symbol,
    pub start: Coordinate,
    pub direction: Direction,
}

impl WinResult {
    /// The `WIN_RUN_LENGTH` cells making up the run, starting at `start`
    pub fn cells(&self) -> ArrayVec<Coordinate, WIN_RUN_LENGTH> {
        (0..WIN_RUN_LENGTH as i32)
            .map(|i| self.start.offset(self.direction, i))
            .collect()
    }
}
