//! Wire messages exchanged over a participant connection.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Events without a payload omit `data`.

use crate::ids::SessionId;
use crate::session::SessionSnapshot;
use serde::{Deserialize, Serialize};
use versus_tictactoe::{Mark, Outcome, Winner};

/// Requests sent by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Open a new session and take X.
    Create,
    /// Join the session with this id.
    Join(String),
    /// Play a cell, 0-8.
    Move(usize),
    /// Leave the current session.
    Leave,
}

/// Notifications pushed to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// A session was opened for the caller.
    Created {
        /// New session id.
        session_id: SessionId,
        /// Caller's mark.
        mark: Mark,
    },
    /// The caller joined a session.
    Joined {
        /// Session after the join.
        session: SessionSnapshot,
        /// Caller's mark.
        mark: Mark,
    },
    /// Session state changed.
    Updated(SessionSnapshot),
    /// The caller's last request was rejected.
    Error(String),
    /// The game ended.
    Finished {
        /// Winning mark or draw.
        winner: Winner,
        /// Human-readable summary.
        message: String,
    },
    /// The opponent left.
    PeerLeft(String),
}

impl ServerEvent {
    /// Builds the `finished` notification for a decided outcome.
    pub fn finished(outcome: &Outcome) -> Option<Self> {
        let winner = outcome.winner()?;
        let message = match winner.mark() {
            Some(mark) if outcome.is_forfeit() => format!("{mark} wins by forfeit"),
            Some(mark) => format!("{mark} wins!"),
            None => "It's a draw!".to_string(),
        };
        Some(ServerEvent::Finished { winner, message })
    }

    /// Builds an `error` notification.
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_events() {
        let parse = |v: serde_json::Value| serde_json::from_value::<ClientEvent>(v).unwrap();
        assert_eq!(parse(json!({"event": "create"})), ClientEvent::Create);
        assert_eq!(
            parse(json!({"event": "join", "data": "AB12CD34"})),
            ClientEvent::Join("AB12CD34".to_string())
        );
        assert_eq!(parse(json!({"event": "move", "data": 4})), ClientEvent::Move(4));
        assert_eq!(parse(json!({"event": "leave"})), ClientEvent::Leave);
    }

    #[test]
    fn test_negative_move_is_malformed() {
        let parsed = serde_json::from_value::<ClientEvent>(json!({"event": "move", "data": -1}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_server_event_wire_names() {
        let json = serde_json::to_value(ServerEvent::PeerLeft("bye".into())).unwrap();
        assert_eq!(json, json!({"event": "peerLeft", "data": "bye"}));

        let json = serde_json::to_value(ServerEvent::Created {
            session_id: SessionId::parse("ABCD1234"),
            mark: Mark::X,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({"event": "created", "data": {"sessionId": "ABCD1234", "mark": "X"}})
        );
    }

    #[test]
    fn test_finished_messages() {
        let msg = |o: Outcome| match ServerEvent::finished(&o) {
            Some(ServerEvent::Finished { message, .. }) => message,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(msg(Outcome::win(Mark::X, [0, 1, 2])), "X wins!");
        assert_eq!(msg(Outcome::draw()), "It's a draw!");
        assert_eq!(msg(Outcome::forfeit(Mark::O)), "O wins by forfeit");
        assert!(ServerEvent::finished(&Outcome::undecided()).is_none());
    }
}
