//! Error types for session and registry operations.

use crate::ids::SessionId;
use crate::session::SessionStatus;
use derive_more::{Display, Error};
use versus_tictactoe::Mark;

/// Why a session operation was rejected.
///
/// Every variant is local to the caller: a rejected operation never
/// changes session state.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// No live session has this id.
    #[display("Game {} not found", _0)]
    NotFound(#[error(not(source))] SessionId),

    /// Operation not valid for the session's current status.
    #[display("Cannot {} while the game is {}", action, status)]
    InvalidState {
        /// The rejected operation.
        action: &'static str,
        /// Status at the time of the request.
        status: SessionStatus,
    },

    /// Both player slots are taken.
    #[display("Game is full")]
    SessionFull,

    /// Caller does not hold the mark whose turn it is.
    #[display("Not your turn; waiting for {}", _0)]
    NotYourTurn(#[error(not(source))] Mark),

    /// Position outside 0-8.
    #[display("Position {} is out of range (must be 0-8)", _0)]
    OutOfRange(#[error(not(source))] usize),

    /// Cell already played.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(#[error(not(source))] usize),
}

/// Operational failure while allocating a session.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RegistryError {
    /// Every generated id collided with a live session.
    #[display("Could not allocate a unique game id after {} attempts", attempts)]
    IdSpaceExhausted {
        /// Number of ids tried.
        attempts: usize,
    },
}
