//! Game rules for tic-tac-toe.
//!
//! Pure functions over a board snapshot. They never mutate the board and
//! never look at whose turn it is.

pub mod draw;
pub mod win;

pub use draw::{is_draw, is_full};
pub use win::check_winner;
