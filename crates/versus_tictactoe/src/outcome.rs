//! Outcome evaluation for a board snapshot.

use crate::rules::{check_winner, is_full};
use crate::{Board, Mark};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

/// Who a finished game went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Winner {
    /// X won.
    #[serde(rename = "X")]
    X,
    /// O won.
    #[serde(rename = "O")]
    O,
    /// Board filled without a line.
    #[serde(rename = "draw")]
    #[display("draw")]
    Draw,
}

impl Winner {
    /// The winning mark, `None` for a draw.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Winner::X => Some(Mark::X),
            Winner::O => Some(Mark::O),
            Winner::Draw => None,
        }
    }
}

impl From<Mark> for Winner {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Winner::X,
            Mark::O => Winner::O,
        }
    }
}

/// Result of evaluating a board.
///
/// `winner` is `None` while the game continues. A win by forfeit carries a
/// winner but no winning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    winner: Option<Winner>,
    winning_line: Option<[usize; 3]>,
}

impl Outcome {
    /// Game continues.
    pub fn undecided() -> Self {
        Self::default()
    }

    /// `mark` completed `line`.
    pub fn win(mark: Mark, line: [usize; 3]) -> Self {
        Self {
            winner: Some(mark.into()),
            winning_line: Some(line),
        }
    }

    /// Board filled without a line.
    pub fn draw() -> Self {
        Self {
            winner: Some(Winner::Draw),
            winning_line: None,
        }
    }

    /// `mark` wins because the opponent left.
    pub fn forfeit(mark: Mark) -> Self {
        Self {
            winner: Some(mark.into()),
            winning_line: None,
        }
    }

    /// The winner, if decided.
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// The completed line, for board wins only.
    pub fn winning_line(&self) -> Option<[usize; 3]> {
        self.winning_line
    }

    /// True once the game is won or drawn.
    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    /// True when the game is drawn.
    pub fn is_draw(&self) -> bool {
        self.winner == Some(Winner::Draw)
    }

    /// True for a win produced by a departure rather than a completed line.
    pub fn is_forfeit(&self) -> bool {
        self.winner.and_then(Winner::mark).is_some() && self.winning_line.is_none()
    }
}

/// Computes the outcome of a board snapshot.
///
/// Returns the first winning line in evaluation order, a draw when the
/// board is full without one, and an undecided outcome otherwise.
#[instrument(level = "trace", skip(board), fields(filled = board.filled()))]
pub fn evaluate(board: &Board) -> Outcome {
    let outcome = if let Some((mark, line)) = check_winner(board) {
        Outcome::win(mark, line)
    } else if is_full(board) {
        Outcome::draw()
    } else {
        Outcome::undecided()
    };
    trace!(?outcome, "Evaluated board");
    outcome
}
