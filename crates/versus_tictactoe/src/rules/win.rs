//! Win detection logic for tic-tac-toe.

use crate::{Board, Cell, Mark, WINNING_LINES};
use tracing::instrument;

/// Checks if there is a winner on the board.
///
/// Lines are scanned in [`WINNING_LINES`] order and the first complete one
/// wins, so a board with two completed lines always reports the same one.
#[instrument(level = "trace")]
pub fn check_winner(board: &Board) -> Option<(Mark, [usize; 3])> {
    let cells = board.cells();
    WINNING_LINES.into_iter().find_map(|line @ [a, b, c]| {
        match (cells[a], cells[b], cells[c]) {
            (Cell::Occupied(m1), Cell::Occupied(m2), Cell::Occupied(m3))
                if m1 == m2 && m2 == m3 =>
            {
                Some((m1, line))
            }
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(marks: &[(usize, Mark)]) -> Board {
        let mut board = Board::new();
        for &(pos, mark) in marks {
            board.place(pos, mark).unwrap();
        }
        board
    }

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(check_winner(&Board::new()), None);
    }

    #[test]
    fn test_winner_top_row() {
        let board = board_with(&[(0, Mark::X), (1, Mark::X), (2, Mark::X)]);
        assert_eq!(check_winner(&board), Some((Mark::X, [0, 1, 2])));
    }

    #[test]
    fn test_winner_anti_diagonal() {
        let board = board_with(&[(2, Mark::O), (4, Mark::O), (6, Mark::O)]);
        assert_eq!(check_winner(&board), Some((Mark::O, [2, 4, 6])));
    }

    #[test]
    fn test_mixed_line_is_not_a_win() {
        let board = board_with(&[(0, Mark::X), (1, Mark::O), (2, Mark::X)]);
        assert_eq!(check_winner(&board), None);
    }

    #[test]
    fn test_first_line_in_order_wins() {
        // X holds both the top row and the left column.
        let board = board_with(&[
            (0, Mark::X),
            (1, Mark::X),
            (2, Mark::X),
            (3, Mark::X),
            (6, Mark::X),
        ]);
        assert_eq!(check_winner(&board), Some((Mark::X, [0, 1, 2])));
    }
}
