//! Versus tic-tac-toe - pure board logic for two-player sessions.
//!
//! This crate holds everything about the game that does not depend on
//! who is playing or how moves arrive:
//!
//! - **Types**: [`Mark`], [`Cell`] and the fixed 3x3 [`Board`]
//! - **Rules**: win and draw detection over the eight canonical lines
//! - **Outcome**: [`evaluate`] folds the rules into a single [`Outcome`]
//!
//! # Example
//!
//! ```
//! use versus_tictactoe::{Board, Mark, Winner, evaluate};
//!
//! let mut board = Board::new();
//! for pos in [0, 1, 2] {
//!     board.place(pos, Mark::X).unwrap();
//! }
//!
//! let outcome = evaluate(&board);
//! assert_eq!(outcome.winner(), Some(Winner::X));
//! assert_eq!(outcome.winning_line(), Some([0, 1, 2]));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod outcome;
pub mod rules;
mod types;

pub use outcome::{Outcome, Winner, evaluate};
pub use types::{BOARD_SIZE, Board, BoardError, Cell, Mark, WINNING_LINES};
