//! A single two-player game and its transition rules.

use crate::error::SessionError;
use crate::ids::{ParticipantId, SessionId};
use chrono::{DateTime, TimeDelta, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};
use versus_tictactoe::{Board, Mark, Outcome, evaluate};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Fewer than two participants; no moves yet.
    #[serde(rename = "waiting")]
    #[display("waiting")]
    Waiting,
    /// Both participants present, game undecided.
    #[serde(rename = "playing")]
    #[display("in progress")]
    InProgress,
    /// Won, drawn or forfeited. Only departures are accepted.
    #[serde(rename = "finished")]
    #[display("finished")]
    Finished,
}

/// Participant bound to each mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Players {
    /// Holder of X (the creator).
    #[serde(rename = "X")]
    pub x: Option<ParticipantId>,
    /// Holder of O.
    #[serde(rename = "O")]
    pub o: Option<ParticipantId>,
}

impl Players {
    /// Participant holding `mark`.
    pub fn get(&self, mark: Mark) -> Option<ParticipantId> {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }

    fn slot_mut(&mut self, mark: Mark) -> &mut Option<ParticipantId> {
        match mark {
            Mark::X => &mut self.x,
            Mark::O => &mut self.o,
        }
    }

    /// Mark held by `participant`, if any.
    pub fn mark_of(&self, participant: ParticipantId) -> Option<Mark> {
        Mark::iter().find(|&mark| self.get(mark) == Some(participant))
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        Mark::iter().filter(|&mark| self.get(mark).is_some()).count()
    }
}

/// What a departure did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The participant was not in this session.
    NotPresent,
    /// Nobody is left; the session must be deleted.
    Emptied,
    /// One participant remains. `forfeit` names the winner when the
    /// departure ended a game in progress.
    Remaining {
        /// Mark awarded the win by forfeit.
        forfeit: Option<Mark>,
    },
}

/// Serializable view of a session, sent to clients on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session id.
    pub id: SessionId,
    /// Board cells, row-major.
    pub board: Board,
    /// Mark to move. Meaningless once finished.
    pub current_player: Mark,
    /// Participants by mark.
    pub players: Players,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Present once finished.
    pub result: Option<Outcome>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One game's complete mutable state.
///
/// Only [`join`](Self::join), [`make_move`](Self::make_move) and
/// [`remove_participant`](Self::remove_participant) mutate it.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    board: Board,
    turn: Mark,
    players: Players,
    status: SessionStatus,
    outcome: Option<Outcome>,
    created_at: DateTime<Utc>,
    retired: bool,
}

impl Session {
    /// Creates a waiting session with `creator` holding X.
    #[instrument(skip(id), fields(session_id = %id))]
    pub fn new(id: SessionId, creator: ParticipantId) -> Self {
        Self::with_created_at(id, creator, Utc::now())
    }

    /// Creates a waiting session with an explicit creation time.
    pub fn with_created_at(
        id: SessionId,
        creator: ParticipantId,
        created_at: DateTime<Utc>,
    ) -> Self {
        info!(session_id = %id, participant_id = %creator, "Creating new game session");
        Self {
            id,
            board: Board::new(),
            turn: Mark::X,
            players: Players {
                x: Some(creator),
                o: None,
            },
            status: SessionStatus::Waiting,
            outcome: None,
            created_at,
            retired: false,
        }
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mark to move.
    pub fn turn(&self) -> Mark {
        self.turn
    }

    /// Participants by mark.
    pub fn players(&self) -> &Players {
        &self.players
    }

    /// Lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Outcome, present once finished.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Creation time.
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Age relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.created_at)
    }

    /// Mark held by `participant`.
    pub fn mark_of(&self, participant: ParticipantId) -> Option<Mark> {
        self.players.mark_of(participant)
    }

    /// True once the session has been emptied or expired and dropped
    /// from its registry.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    /// Takes the free slot. The session starts once both are filled.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn join(&mut self, participant: ParticipantId) -> Result<Mark, SessionError> {
        if self.players.count() == 2 {
            warn!(%participant, "Session already has 2 players");
            return Err(SessionError::SessionFull);
        }
        if self.status != SessionStatus::Waiting || self.mark_of(participant).is_some() {
            warn!(%participant, status = %self.status, "Join rejected");
            return Err(SessionError::InvalidState {
                action: "join",
                status: self.status,
            });
        }

        let mark = Mark::iter()
            .find(|&mark| self.players.get(mark).is_none())
            .ok_or(SessionError::SessionFull)?;
        *self.players.slot_mut(mark) = Some(participant);

        if self.players.count() == 2 {
            self.status = SessionStatus::InProgress;
        }

        info!(%participant, %mark, status = %self.status, "Participant joined");
        Ok(mark)
    }

    /// Places the caller's mark at `position` (0-8).
    ///
    /// Checks run in order: status, range, occupancy, turn. An occupied
    /// cell is therefore reported as such whoever asks.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn make_move(
        &mut self,
        participant: ParticipantId,
        position: usize,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::InProgress {
            warn!(%participant, status = %self.status, "Move outside of play");
            return Err(SessionError::InvalidState {
                action: "move",
                status: self.status,
            });
        }
        if !Board::is_valid_position(position) {
            warn!(%participant, position, "Move out of range");
            return Err(SessionError::OutOfRange(position));
        }
        if !self.board.is_cell_empty(position) {
            warn!(%participant, position, "Move onto occupied cell");
            return Err(SessionError::CellOccupied(position));
        }
        if self.players.get(self.turn) != Some(participant) {
            warn!(%participant, expected_mark = %self.turn, "Player tried to move out of turn");
            return Err(SessionError::NotYourTurn(self.turn));
        }

        let mark = self.turn;
        self.board.place(position, mark).map_err(|e| {
            warn!(error = %e, "Board rejected a checked move");
            SessionError::CellOccupied(position)
        })?;

        let outcome = evaluate(&self.board);
        if outcome.is_decided() {
            self.status = SessionStatus::Finished;
            self.outcome = Some(outcome);
            info!(%participant, position, ?outcome, "Game finished");
        } else {
            self.turn = mark.opponent();
            debug!(%participant, position, next = %self.turn, "Move completed successfully");
        }
        debug!(board = %self.board, "Board after move");

        Ok(())
    }

    /// Clears `participant`'s slot.
    ///
    /// Leaving a game in progress hands the win to the remaining mark. The
    /// session never deletes itself; an [`Departure::Emptied`] result tells
    /// the owner to drop it.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn remove_participant(&mut self, participant: ParticipantId) -> Departure {
        let Some(mark) = self.mark_of(participant) else {
            debug!(%participant, "Participant not in session");
            return Departure::NotPresent;
        };
        *self.players.slot_mut(mark) = None;

        let Some(remaining) = Mark::iter().find(|&m| self.players.get(m).is_some()) else {
            info!(%participant, %mark, "Last participant left");
            self.retire();
            return Departure::Emptied;
        };

        let forfeit = if self.status == SessionStatus::InProgress {
            self.status = SessionStatus::Finished;
            self.outcome = Some(Outcome::forfeit(remaining));
            Some(remaining)
        } else {
            None
        };

        info!(%participant, %mark, ?forfeit, status = %self.status, "Participant left");
        Departure::Remaining { forfeit }
    }

    /// Copies the state for sending to clients.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            board: self.board.clone(),
            current_player: self.turn,
            players: self.players,
            status: self.status,
            result: self.outcome,
            created_at: self.created_at,
        }
    }
}
