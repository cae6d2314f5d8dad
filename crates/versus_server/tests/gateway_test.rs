//! Tests for gateway routing over in-memory connections.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use versus_server::{
    ALREADY_IN_GAME_MESSAGE, ClientEvent, Gateway, Mark, NOT_IN_GAME_MESSAGE, PEER_LEFT_MESSAGE,
    ParticipantId, ServerEvent, SessionId, SessionRegistry, SessionSnapshot, SessionStatus,
    Winner,
};

struct Conn {
    id: ParticipantId,
    inbox: UnboundedReceiver<ServerEvent>,
}

impl Conn {
    fn open(gateway: &Gateway) -> Self {
        let (id, inbox) = gateway.connect();
        Self { id, inbox }
    }

    fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbox.try_recv() {
            events.push(event);
        }
        events
    }
}

fn gateway() -> Gateway {
    Gateway::new(Arc::new(SessionRegistry::new()))
}

fn updated(events: &[ServerEvent]) -> Vec<&SessionSnapshot> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Updated(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Host creates, guest joins; returns both with drained inboxes.
fn paired(gateway: &Gateway) -> (Conn, Conn, SessionId) {
    let mut host = Conn::open(gateway);
    let mut guest = Conn::open(gateway);

    gateway.handle(host.id, ClientEvent::Create);
    let session_id = match host.drain().first() {
        Some(ServerEvent::Created { session_id, .. }) => session_id.clone(),
        other => panic!("expected created, got {other:?}"),
    };
    gateway.handle(guest.id, ClientEvent::Join(session_id.to_string()));
    host.drain();
    guest.drain();
    (host, guest, session_id)
}

#[test]
fn test_create_sends_created_then_updated_to_creator() {
    let gateway = gateway();
    let mut host = Conn::open(&gateway);
    let mut other = Conn::open(&gateway);

    gateway.handle(host.id, ClientEvent::Create);

    let events = host.drain();
    assert_eq!(events.len(), 2);
    let ServerEvent::Created { session_id, mark } = &events[0] else {
        panic!("expected created first, got {:?}", events[0]);
    };
    assert_eq!(*mark, Mark::X);
    let ServerEvent::Updated(snapshot) = &events[1] else {
        panic!("expected updated second, got {:?}", events[1]);
    };
    assert_eq!(&snapshot.id, session_id);
    assert_eq!(snapshot.status, SessionStatus::Waiting);

    assert!(other.drain().is_empty());
    assert_eq!(gateway.binding(host.id).unwrap().mark, Mark::X);
}

#[test]
fn test_join_notifies_joiner_and_broadcasts_update() {
    let gateway = gateway();
    let mut host = Conn::open(&gateway);
    let mut guest = Conn::open(&gateway);
    let mut bystander = Conn::open(&gateway);

    gateway.handle(host.id, ClientEvent::Create);
    let Some(ServerEvent::Created { session_id, .. }) = host.drain().into_iter().next() else {
        panic!("expected created");
    };

    // Typed in lowercase with stray whitespace.
    let typed = format!(" {} ", session_id.as_str().to_lowercase());
    gateway.handle(guest.id, ClientEvent::Join(typed));

    let guest_events = guest.drain();
    assert!(matches!(
        &guest_events[0],
        ServerEvent::Joined { mark: Mark::O, session } if session.status == SessionStatus::InProgress
    ));
    assert_eq!(updated(&guest_events).len(), 1);

    let host_events = host.drain();
    assert_eq!(updated(&host_events).len(), 1);
    assert_eq!(updated(&host_events)[0].status, SessionStatus::InProgress);

    assert!(bystander.drain().is_empty());
}

#[test]
fn test_join_unknown_session_errors_to_sender_only() {
    let gateway = gateway();
    let mut guest = Conn::open(&gateway);

    gateway.handle(guest.id, ClientEvent::Join("ZZZZZZZZ".into()));

    let events = guest.drain();
    assert!(matches!(&events[..], [ServerEvent::Error(msg)] if msg.contains("not found")));
    assert!(gateway.binding(guest.id).is_none());
}

#[test]
fn test_join_full_session_errors() {
    let gateway = gateway();
    let (mut host, mut guest, session_id) = paired(&gateway);
    let mut late = Conn::open(&gateway);

    gateway.handle(late.id, ClientEvent::Join(session_id.to_string()));

    assert!(matches!(&late.drain()[..], [ServerEvent::Error(msg)] if msg == "Game is full"));
    assert!(host.drain().is_empty());
    assert!(guest.drain().is_empty());
}

#[test]
fn test_move_broadcasts_update_to_both() {
    let gateway = gateway();
    let (mut host, mut guest, _) = paired(&gateway);

    gateway.handle(host.id, ClientEvent::Move(4));

    for events in [host.drain(), guest.drain()] {
        let snapshots = updated(&events);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].board.filled(), 1);
        assert_eq!(snapshots[0].current_player, Mark::O);
    }
}

#[test]
fn test_rejected_move_errors_to_sender_only() {
    let gateway = gateway();
    let (mut host, mut guest, _) = paired(&gateway);

    gateway.handle(guest.id, ClientEvent::Move(4));

    assert!(matches!(&guest.drain()[..], [ServerEvent::Error(msg)] if msg.contains("Not your turn")));
    assert!(host.drain().is_empty());
}

#[test]
fn test_move_without_game_errors() {
    let gateway = gateway();
    let mut loner = Conn::open(&gateway);

    gateway.handle(loner.id, ClientEvent::Move(0));

    assert_eq!(
        loner.drain(),
        vec![ServerEvent::Error(NOT_IN_GAME_MESSAGE.to_string())]
    );
}

#[test]
fn test_winning_move_broadcasts_finished() {
    let gateway = gateway();
    let (mut host, mut guest, _) = paired(&gateway);

    for (conn, pos) in [(&host, 0), (&guest, 3), (&host, 1), (&guest, 4), (&host, 2)] {
        gateway.handle(conn.id, ClientEvent::Move(pos));
    }

    for events in [host.drain(), guest.drain()] {
        let last_update = *updated(&events).last().unwrap();
        assert_eq!(last_update.status, SessionStatus::Finished);
        assert_eq!(
            events.last(),
            Some(&ServerEvent::Finished {
                winner: Winner::X,
                message: "X wins!".to_string()
            })
        );
    }
}

#[test]
fn test_leave_mid_game_notifies_remaining_player() {
    let gateway = gateway();
    let (mut host, mut guest, _) = paired(&gateway);
    gateway.handle(host.id, ClientEvent::Move(4));
    host.drain();
    guest.drain();

    gateway.handle(guest.id, ClientEvent::Leave);

    let events = host.drain();
    assert_eq!(events[0], ServerEvent::PeerLeft(PEER_LEFT_MESSAGE.to_string()));
    let snapshot = updated(&events)[0];
    assert_eq!(snapshot.status, SessionStatus::Finished);
    assert!(snapshot.result.unwrap().is_forfeit());
    assert_eq!(
        events.last(),
        Some(&ServerEvent::Finished {
            winner: Winner::X,
            message: "X wins by forfeit".to_string()
        })
    );

    assert!(guest.drain().is_empty());
    assert!(gateway.binding(guest.id).is_none());
}

#[test]
fn test_disconnect_is_treated_as_leave() {
    let gateway = gateway();
    let (mut host, guest, session_id) = paired(&gateway);

    gateway.disconnect(guest.id);

    let events = host.drain();
    assert_eq!(events[0], ServerEvent::PeerLeft(PEER_LEFT_MESSAGE.to_string()));
    assert_eq!(gateway.connection_count(), 1);

    gateway.disconnect(host.id);
    assert!(gateway.registry().get(&session_id).is_none());
    assert_eq!(gateway.connection_count(), 0);
}

#[test]
fn test_creator_leaving_waiting_session_deletes_it() {
    let gateway = gateway();
    let mut host = Conn::open(&gateway);
    gateway.handle(host.id, ClientEvent::Create);
    let Some(ServerEvent::Created { session_id, .. }) = host.drain().into_iter().next() else {
        panic!("expected created");
    };

    gateway.handle(host.id, ClientEvent::Leave);

    assert!(gateway.registry().get(&session_id).is_none());
    assert!(gateway.binding(host.id).is_none());

    // The connection can start over.
    gateway.handle(host.id, ClientEvent::Create);
    assert!(matches!(host.drain().first(), Some(ServerEvent::Created { .. })));
}

#[test]
fn test_bound_connection_cannot_create_or_join() {
    let gateway = gateway();
    let (mut host, _guest, session_id) = paired(&gateway);

    gateway.handle(host.id, ClientEvent::Create);
    gateway.handle(host.id, ClientEvent::Join(session_id.to_string()));

    let expected = ServerEvent::Error(ALREADY_IN_GAME_MESSAGE.to_string());
    assert_eq!(host.drain(), vec![expected.clone(), expected]);
    assert_eq!(gateway.registry().len(), 1);
}

#[test]
fn test_malformed_frame_errors_to_sender() {
    let gateway = gateway();
    let (mut host, mut guest, _) = paired(&gateway);

    gateway.handle_frame(host.id, r#"{"event": "move", "data": "centre"}"#);
    gateway.handle_frame(host.id, "not json");

    let events = host.drain();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, ServerEvent::Error(msg) if msg.starts_with("Malformed message"))));
    assert!(guest.drain().is_empty());
}

#[test]
fn test_frames_drive_a_game() {
    let gateway = gateway();
    let (mut host, mut guest, _) = paired(&gateway);

    gateway.handle_frame(host.id, r#"{"event": "move", "data": 0}"#);
    gateway.handle_frame(guest.id, r#"{"event": "move", "data": 8}"#);

    let events = host.drain();
    assert_eq!(updated(&events).len(), 2);
    assert_eq!(updated(&events)[1].current_player, Mark::X);
    assert_eq!(updated(&guest.drain()).len(), 2);
}
