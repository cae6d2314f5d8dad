//! Connection gateway: routes participant requests to the registry and
//! fans results out to the connections bound to each session.
//!
//! The gateway is transport-agnostic. A transport calls
//! [`Gateway::connect`] once per connection, forwards every inbound frame
//! to [`Gateway::handle_frame`] (or a decoded [`ClientEvent`] to
//! [`Gateway::handle`]), drains the returned receiver into the connection,
//! and calls [`Gateway::disconnect`] when the connection drops.

mod protocol;
mod socket;

pub use protocol::{ClientEvent, ServerEvent};
pub use socket::ws_handler;

use crate::ids::{ParticipantId, SessionId};
use crate::registry::{Removal, SessionRegistry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, instrument, warn};
use versus_tictactoe::Mark;

/// Text sent to the remaining participant when the opponent leaves.
pub const PEER_LEFT_MESSAGE: &str = "Opponent has left the game";
/// Error text for a move from a connection with no session.
pub const NOT_IN_GAME_MESSAGE: &str = "You are not in a game";
/// Error text for create/join from a connection already in a session.
pub const ALREADY_IN_GAME_MESSAGE: &str = "Already in a game; leave it first";

/// Session a connection is playing in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Bound session.
    pub session_id: SessionId,
    /// Mark held in that session.
    pub mark: Mark,
}

#[derive(Debug)]
struct Peer {
    outbox: UnboundedSender<ServerEvent>,
    binding: Option<Binding>,
}

/// Routes events between connections and the session registry.
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<SessionRegistry>,
    peers: Mutex<HashMap<ParticipantId, Peer>>,
}

impl Gateway {
    /// Creates a gateway over a shared registry.
    #[instrument(skip(registry))]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        info!("Creating connection gateway");
        Self {
            registry,
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// The registry this gateway routes to.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn peers(&self) -> MutexGuard<'_, HashMap<ParticipantId, Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new connection. Events for it arrive on the receiver.
    #[instrument(skip(self))]
    pub fn connect(&self) -> (ParticipantId, UnboundedReceiver<ServerEvent>) {
        let participant = ParticipantId::new();
        let (outbox, inbox) = unbounded_channel();
        let mut peers = self.peers();
        peers.insert(
            participant,
            Peer {
                outbox,
                binding: None,
            },
        );
        info!(%participant, connected = peers.len(), "Player connected");
        (participant, inbox)
    }

    /// Current binding of a connection.
    pub fn binding(&self, participant: ParticipantId) -> Option<Binding> {
        self.peers()
            .get(&participant)
            .and_then(|peer| peer.binding.clone())
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.peers().len()
    }

    /// Decodes a JSON text frame and handles it. Undecodable frames are
    /// answered with an error to the sender only.
    #[instrument(skip(self, frame))]
    pub fn handle_frame(&self, participant: ParticipantId, frame: &str) {
        match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle(participant, event),
            Err(e) => {
                warn!(%participant, error = %e, "Malformed frame");
                self.send(participant, ServerEvent::error(format!("Malformed message: {e}")));
            }
        }
    }

    /// Handles one inbound event from `participant`.
    #[instrument(skip(self))]
    pub fn handle(&self, participant: ParticipantId, event: ClientEvent) {
        match event {
            ClientEvent::Create => self.on_create(participant),
            ClientEvent::Join(raw_id) => self.on_join(participant, &raw_id),
            ClientEvent::Move(position) => self.on_move(participant, position),
            ClientEvent::Leave => self.on_leave(participant),
        }
    }

    /// Connection lost: leave any session, then forget the connection.
    #[instrument(skip(self))]
    pub fn disconnect(&self, participant: ParticipantId) {
        info!(%participant, "Player disconnected");
        self.on_leave(participant);
        self.peers().remove(&participant);
    }

    fn on_create(&self, participant: ParticipantId) {
        if self.binding(participant).is_some() {
            self.send(participant, ServerEvent::error(ALREADY_IN_GAME_MESSAGE));
            return;
        }

        let snapshot = match self.registry.create(participant) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(%participant, error = %e, "Create failed");
                self.send(participant, ServerEvent::error(e.to_string()));
                return;
            }
        };

        self.bind(participant, snapshot.id.clone(), Mark::X);
        self.send(
            participant,
            ServerEvent::Created {
                session_id: snapshot.id.clone(),
                mark: Mark::X,
            },
        );
        info!(session_id = %snapshot.id, %participant, "Game created");
        self.send(participant, ServerEvent::Updated(snapshot));
    }

    fn on_join(&self, participant: ParticipantId, raw_id: &str) {
        if self.binding(participant).is_some() {
            self.send(participant, ServerEvent::error(ALREADY_IN_GAME_MESSAGE));
            return;
        }

        let session_id = SessionId::parse(raw_id);
        let (mark, snapshot) = match self.registry.join(&session_id, participant) {
            Ok(joined) => joined,
            Err(e) => {
                warn!(%participant, %session_id, error = %e, "Join failed");
                self.send(participant, ServerEvent::error(e.to_string()));
                return;
            }
        };

        self.bind(participant, session_id.clone(), mark);
        self.send(
            participant,
            ServerEvent::Joined {
                session: snapshot.clone(),
                mark,
            },
        );
        info!(%session_id, %participant, %mark, "Player joined game");
        self.broadcast(&session_id, &ServerEvent::Updated(snapshot));
    }

    fn on_move(&self, participant: ParticipantId, position: usize) {
        let Some(binding) = self.binding(participant) else {
            self.send(participant, ServerEvent::error(NOT_IN_GAME_MESSAGE));
            return;
        };

        let snapshot = match self
            .registry
            .make_move(&binding.session_id, participant, position)
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(%participant, position, error = %e, "Move rejected");
                self.send(participant, ServerEvent::error(e.to_string()));
                return;
            }
        };

        debug!(session_id = %binding.session_id, position, "Move made");
        let finished = snapshot.result.as_ref().and_then(ServerEvent::finished);
        self.broadcast(&binding.session_id, &ServerEvent::Updated(snapshot));
        if let Some(finished) = finished {
            self.broadcast(&binding.session_id, &finished);
        }
    }

    fn on_leave(&self, participant: ParticipantId) {
        let Some(binding) = self.unbind(participant) else {
            return;
        };
        let session_id = binding.session_id;

        match self.registry.remove_participant(&session_id, participant) {
            Removal::Remaining { snapshot, forfeit } => {
                self.broadcast(&session_id, &ServerEvent::PeerLeft(PEER_LEFT_MESSAGE.into()));
                let finished = forfeit
                    .and(snapshot.result.as_ref())
                    .and_then(ServerEvent::finished);
                self.broadcast(&session_id, &ServerEvent::Updated(snapshot));
                if let Some(finished) = finished {
                    self.broadcast(&session_id, &finished);
                }
            }
            Removal::Deleted | Removal::NotPresent | Removal::Unknown => {}
        }
        info!(%session_id, %participant, "Player left game");
    }

    fn bind(&self, participant: ParticipantId, session_id: SessionId, mark: Mark) {
        if let Some(peer) = self.peers().get_mut(&participant) {
            peer.binding = Some(Binding { session_id, mark });
        }
    }

    fn unbind(&self, participant: ParticipantId) -> Option<Binding> {
        self.peers()
            .get_mut(&participant)
            .and_then(|peer| peer.binding.take())
    }

    fn send(&self, participant: ParticipantId, event: ServerEvent) {
        if let Some(peer) = self.peers().get(&participant) {
            if peer.outbox.send(event).is_err() {
                debug!(%participant, "Connection already closed");
            }
        }
    }

    fn broadcast(&self, session_id: &SessionId, event: &ServerEvent) {
        let peers = self.peers();
        let recipients = peers.iter().filter(|(_, peer)| {
            peer.binding
                .as_ref()
                .is_some_and(|b| &b.session_id == session_id)
        });
        for (participant, peer) in recipients {
            if peer.outbox.send(event.clone()).is_err() {
                debug!(%participant, "Connection already closed");
            }
        }
    }
}
