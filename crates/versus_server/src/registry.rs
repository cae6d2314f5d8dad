//! Live session registry and expiry.

use crate::error::{RegistryError, SessionError};
use crate::ids::{DEFAULT_ID_LENGTH, ParticipantId, SessionId};
use crate::session::{Departure, Session, SessionSnapshot};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use versus_tictactoe::Mark;

/// Attempts at drawing an unused id before creation gives up.
pub const MAX_ID_ATTEMPTS: usize = 16;

type SessionCell = Arc<Mutex<Session>>;

/// Result of removing a participant through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// No session with that id.
    Unknown,
    /// The session exists but the participant was not in it.
    NotPresent,
    /// The last participant left and the session was deleted.
    Deleted,
    /// Someone is still in the session.
    Remaining {
        /// State after the departure.
        snapshot: SessionSnapshot,
        /// Mark awarded the win if the departure ended a game in progress.
        forfeit: Option<Mark>,
    },
}

impl Removal {
    /// False only when the session id was unknown.
    pub fn found(&self) -> bool {
        !matches!(self, Removal::Unknown)
    }
}

/// Owns every live session.
///
/// The map lock is held only to find, insert or delete entries. Each
/// session has its own lock, so operations on different sessions run
/// independently while operations on one session are serialized. Lock
/// order is always map, then session.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionCell>>,
    id_length: usize,
}

fn lock(cell: &SessionCell) -> MutexGuard<'_, Session> {
    // Every critical section leaves the session consistent, so a poisoned
    // lock still guards valid state.
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionRegistry {
    /// Creates an empty registry with default-length ids.
    #[instrument]
    pub fn new() -> Self {
        Self::with_id_length(DEFAULT_ID_LENGTH)
    }

    /// Creates an empty registry generating ids of `id_length` characters.
    #[instrument]
    pub fn with_id_length(id_length: usize) -> Self {
        info!(id_length, "Creating session registry");
        Self {
            sessions: RwLock::new(HashMap::new()),
            id_length,
        }
    }

    fn entry(&self, id: &SessionId) -> Option<SessionCell> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Opens a new waiting session with `creator` holding X.
    #[instrument(skip(self))]
    pub fn create(&self, creator: ParticipantId) -> Result<SessionSnapshot, RegistryError> {
        self.create_at(creator, Utc::now())
    }

    /// Same as [`create`](Self::create) with an explicit creation time.
    #[instrument(skip(self))]
    pub fn create_at(
        &self,
        creator: ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<SessionSnapshot, RegistryError> {
        let mut rng = rand::thread_rng();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = SessionId::generate(&mut rng, self.id_length);
            if sessions.contains_key(&id) {
                warn!(session_id = %id, attempt, "Generated id collided, retrying");
                continue;
            }
            let session = Session::with_created_at(id.clone(), creator, now);
            let snapshot = session.snapshot();
            sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
            info!(session_id = %id, live = sessions.len(), "Created new session");
            return Ok(snapshot);
        }

        error!(attempts = MAX_ID_ATTEMPTS, "Session id space exhausted");
        Err(RegistryError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Snapshot of a live session.
    #[instrument(skip(self))]
    pub fn get(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let Some(cell) = self.entry(id) else {
            debug!(session_id = %id, "Session not found");
            return None;
        };
        let session = lock(&cell);
        (!session.is_retired()).then(|| session.snapshot())
    }

    /// Runs `op` on a live session under its lock.
    fn with_session<T>(
        &self,
        id: &SessionId,
        op: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let cell = self
            .entry(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        let mut session = lock(&cell);
        // Lost a race with deletion after the lookup.
        if session.is_retired() {
            return Err(SessionError::NotFound(id.clone()));
        }
        op(&mut session)
    }

    /// Adds `participant` to a waiting session.
    #[instrument(skip(self))]
    pub fn join(
        &self,
        id: &SessionId,
        participant: ParticipantId,
    ) -> Result<(Mark, SessionSnapshot), SessionError> {
        self.with_session(id, |session| {
            let mark = session.join(participant)?;
            Ok((mark, session.snapshot()))
        })
    }

    /// Plays `position` for `participant`.
    #[instrument(skip(self))]
    pub fn make_move(
        &self,
        id: &SessionId,
        participant: ParticipantId,
        position: usize,
    ) -> Result<SessionSnapshot, SessionError> {
        self.with_session(id, |session| {
            session.make_move(participant, position)?;
            Ok(session.snapshot())
        })
    }

    /// Removes `participant`, deleting the session when it empties.
    #[instrument(skip(self))]
    pub fn remove_participant(&self, id: &SessionId, participant: ParticipantId) -> Removal {
        let Some(cell) = self.entry(id) else {
            debug!(session_id = %id, "Removal from unknown session");
            return Removal::Unknown;
        };

        let removal = {
            let mut session = lock(&cell);
            if session.is_retired() {
                return Removal::Unknown;
            }
            match session.remove_participant(participant) {
                Departure::NotPresent => Removal::NotPresent,
                Departure::Emptied => Removal::Deleted,
                Departure::Remaining { forfeit } => Removal::Remaining {
                    snapshot: session.snapshot(),
                    forfeit,
                },
            }
        };

        if removal == Removal::Deleted {
            // Session lock released above; the map lock comes first.
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            if sessions.get(id).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                sessions.remove(id);
            }
            info!(session_id = %id, live = sessions.len(), "Deleted empty session");
        }

        removal
    }

    /// Deletes every session older than `max_age`.
    #[instrument(skip(self))]
    pub fn reap(&self, max_age: Duration) -> usize {
        self.reap_at(Utc::now(), max_age)
    }

    /// Same as [`reap`](Self::reap) with an explicit clock reading.
    #[instrument(skip(self))]
    pub fn reap_at(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();

        sessions.retain(|id, cell| {
            let mut session = lock(cell);
            if session.age(now) > max_age {
                debug!(session_id = %id, age = %session.age(now), "Reaping expired session");
                session.retire();
                false
            } else {
                true
            }
        });

        let reaped = before - sessions.len();
        if reaped > 0 {
            info!(reaped, live = sessions.len(), "Reaped expired sessions");
        }
        reaped
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no session is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all live sessions.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts the background task that reaps sessions older than `max_age`
/// every `every`. Abort the handle to stop it.
#[instrument(skip(registry))]
pub fn spawn_reaper(
    registry: Arc<SessionRegistry>,
    every: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    info!("Starting session reaper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = registry.reap(max_age);
            debug!(reaped, live = registry.len(), "Reaper sweep complete");
        }
    })
}
