//! Integration tests - whole games through the arbiter

use gomoku_net::core::{find_win, Board, MoveArbiter, MoveOutcome, Phase, PlayerId, RandomWalkBot};
use gomoku_net::types::{BoardSize, Coordinate, Direction, Symbol, WinResult};
use quickcheck::quickcheck;

const CROSS: PlayerId = PlayerId(1);
const NOUGHT: PlayerId = PlayerId(2);

fn new_game() -> MoveArbiter {
    let mut game = MoveArbiter::new(Board::default());
    game.add_players(CROSS, NOUGHT).unwrap();
    game
}

fn c(x: i32, y: i32) -> Coordinate {
    Coordinate::new(x, y)
}

/// Alternate moves, Cross first, returning the last outcome.
fn play(game: &mut MoveArbiter, moves: &[(i32, i32)]) -> MoveOutcome {
    let mut last = MoveOutcome::Ignored;
    for (i, &(x, y)) in moves.iter().enumerate() {
        let player = if i % 2 == 0 { CROSS } else { NOUGHT };
        last = game.request_move(player, c(x, y));
        assert!(last.is_applied(), "move {i} at ({x}, {y}) rejected");
    }
    last
}

#[test]
fn test_five_across_from_origin() {
    let mut game = new_game();
    let out = play(
        &mut game,
        &[(0, 0), (0, 9), (1, 0), (1, 9), (2, 0), (2, 9), (3, 0), (3, 9), (4, 0)],
    );
    let expected = WinResult {
        symbol: Symbol::Cross,
        start: c(0, 0),
        direction: Direction::Horizontal,
    };
    assert_eq!(
        out,
        MoveOutcome::Won {
            marked: c(4, 0),
            result: expected
        }
    );
    assert_eq!(game.phase(), Phase::Won(expected));
    assert_eq!(game.snapshot().winner, Some(expected));
}

#[test]
fn test_nought_diagonal_win() {
    let mut game = new_game();
    let out = play(
        &mut game,
        &[
            (50, 50), (10, 10),
            (52, 50), (11, 11),
            (54, 50), (12, 12),
            (56, 50), (14, 14),
            (58, 50), (13, 13),
        ],
    );
    match out {
        MoveOutcome::Won { marked, result } => {
            assert_eq!(marked, c(13, 13));
            assert_eq!(result.symbol, Symbol::Nought);
            assert_eq!(result.start, c(10, 10));
            assert_eq!(result.direction, Direction::Diagonal);
            assert_eq!(result.cells().last(), Some(&c(14, 14)));
        }
        other => panic!("expected a win, got {other:?}"),
    }
}

#[test]
fn test_cross_then_vertical_prefers_horizontal() {
    let mut game = new_game();
    // Cross builds a horizontal and a vertical arm meeting at (20, 20).
    let out = play(
        &mut game,
        &[
            (16, 20), (0, 0),
            (17, 20), (0, 2),
            (18, 20), (0, 4),
            (19, 20), (0, 6),
            (20, 16), (0, 8),
            (20, 17), (0, 10),
            (20, 18), (0, 12),
            (20, 19), (0, 14),
            (20, 20),
        ],
    );
    match out {
        MoveOutcome::Won { result, .. } => {
            assert_eq!(result.direction, Direction::Horizontal);
            assert_eq!(result.start, c(16, 20));
        }
        other => panic!("expected a win, got {other:?}"),
    }
}

#[test]
fn test_off_turn_request_changes_nothing() {
    let mut game = new_game();
    let before = game.snapshot();
    assert_eq!(game.request_move(NOUGHT, c(1, 1)), MoveOutcome::Ignored);
    assert_eq!(game.snapshot(), before);
    assert_eq!(game.current(), Symbol::Cross);
}

#[test]
fn test_everything_ignored_after_win() {
    let mut game = new_game();
    play(
        &mut game,
        &[(0, 0), (0, 9), (1, 0), (1, 9), (2, 0), (2, 9), (3, 0), (3, 9), (4, 0)],
    );
    assert_eq!(game.request_move(NOUGHT, c(30, 30)), MoveOutcome::Ignored);
    assert_eq!(game.apply_mark(Symbol::Nought, c(30, 30)), MoveOutcome::Ignored);
    assert_eq!(game.time_expired(), None);
    assert!(!game.board().is_marked(c(30, 30)));
}

#[test]
fn test_expiry_hands_turn_over() {
    let mut game = new_game();
    assert_eq!(game.time_expired(), Some(Symbol::Nought));
    assert_eq!(game.request_move(CROSS, c(1, 1)), MoveOutcome::Ignored);
    assert!(game.request_move(NOUGHT, c(1, 1)).is_applied());
    assert_eq!(game.current(), Symbol::Cross);
}

#[test]
fn test_bots_against_each_other_reach_a_win() {
    let mut game = MoveArbiter::new(Board::new(BoardSize::new(50, 50)).unwrap());
    game.add_players(CROSS, NOUGHT).unwrap();
    let mut bots = [RandomWalkBot::new(11), RandomWalkBot::new(29)];
    let ids = [CROSS, NOUGHT];

    for _ in 0..2_500 {
        let turn = game.current().index();
        let Some(at) = bots[turn].choose(game.board()) else { break };
        if let MoveOutcome::Won { result, .. } = game.request_move(ids[turn], at) {
            for cell in result.cells() {
                assert_eq!(game.board().get(cell), Some(result.symbol));
            }
            return;
        }
    }
    panic!("no winner on a full board");
}

quickcheck! {
    fn reported_wins_are_real(moves: Vec<(u8, u8)>) -> bool {
        let mut game = new_game();
        for (i, (x, y)) in moves.into_iter().enumerate() {
            let player = if i % 2 == 0 { CROSS } else { NOUGHT };
            let at = c((x % 12) as i32, (y % 12) as i32);
            if let MoveOutcome::Won { marked, result } = game.request_move(player, at) {
                let complete = result
                    .cells()
                    .iter()
                    .all(|&cell| game.board().get(cell) == Some(result.symbol));
                return complete && find_win(game.board(), marked, result.symbol) == Some(result);
            }
        }
        !game.is_over()
    }
}
