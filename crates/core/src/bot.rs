//! Random-walk bot
//!
//! Picks a random free cell near its previous move, widening the search
//! radius every time a draw lands on a marked or off-board cell. Deterministic
//! for a given seed, which keeps bot games reproducible in tests.

use crate::board::Board;
use crate::types::Coordinate;

/// LCG with the Numerical Recipes constants (a=1664525, c=1013904223, m=2^32)
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    pub fn new(seed: u32) -> Self {
        // A zero state would only ever produce the increment sequence.
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Uniform-ish value in `[-radius, radius)`
    pub fn next_offset(&mut self, radius: u32) -> i32 {
        let span = radius.saturating_mul(2).max(1);
        // High bits of an LCG are the better-distributed ones.
        ((self.next_u32() >> 8) % span) as i32 - radius as i32
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

#[derive(Debug, Clone)]
pub struct RandomWalkBot {
    rng: SimpleRng,
    last: Coordinate,
}

impl RandomWalkBot {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            last: Coordinate::new(0, 0),
        }
    }

    /// Choose the next cell, or `None` if the board has no free cell left.
    pub fn choose(&mut self, board: &Board) -> Option<Coordinate> {
        if board.is_full() {
            return None;
        }
        let size = board.size();
        let mut radius = 2u32;
        loop {
            let candidate = Coordinate::new(
                self.last.x + self.rng.next_offset(radius),
                self.last.y + self.rng.next_offset(radius),
            );
            // Capped at the longer side so every cell stays reachable.
            if radius < size.width.max(size.height) {
                radius += 1;
            }
            if board.is_in_bounds(candidate) && !board.is_marked(candidate) {
                self.last = candidate;
                return Some(candidate);
            }
        }
    }

    pub fn last_move(&self) -> Coordinate {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoardSize, Symbol};

    #[test]
    fn test_rng_deterministic() {
        let mut a = SimpleRng::new(12345);
        let mut b = SimpleRng::new(12345);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_offsets_stay_in_range() {
        let mut rng = SimpleRng::new(7);
        for radius in 1..20 {
            for _ in 0..200 {
                let o = rng.next_offset(radius);
                assert!(o >= -(radius as i32) && o < radius as i32, "{o} for {radius}");
            }
        }
    }

    #[test]
    fn test_bot_picks_free_in_bounds_cells() {
        let mut board = Board::new(BoardSize::new(50, 50)).unwrap();
        let mut bot = RandomWalkBot::new(42);
        for _ in 0..300 {
            let c = bot.choose(&board).expect("board has room");
            assert!(board.mark_if_possible(c, Symbol::Nought), "bot chose {c}");
        }
        assert_eq!(board.len(), 300);
    }

    #[test]
    fn test_same_seed_same_game() {
        let board = Board::new(BoardSize::new(60, 60)).unwrap();
        let mut a = RandomWalkBot::new(9);
        let mut b = RandomWalkBot::new(9);
        assert_eq!(a.choose(&board), b.choose(&board));
    }

    #[test]
    fn test_reaches_past_the_short_side() {
        // Every cell within the short side of the start is taken.
        let mut board = Board::new(BoardSize::new(50, 1000)).unwrap();
        for y in 0..60 {
            for x in 0..50 {
                board.mark_if_possible(Coordinate::new(x, y), Symbol::Cross);
            }
        }
        let mut bot = RandomWalkBot::new(5);
        let c = bot.choose(&board).expect("board has room");
        assert!(c.y >= 60, "bot chose {c}");
    }
}
