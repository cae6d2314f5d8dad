//! Versus server - real-time two-player tic-tac-toe sessions.
//!
//! # Architecture
//!
//! - **Session**: one game's state and its join/move/leave rules
//! - **Registry**: owns live sessions, serializes access per session and
//!   reaps expired ones in the background
//! - **Gateway**: binds each connection to a session and mark, routes
//!   requests and fans results out to both players
//! - **HTTP**: WebSocket endpoint (`/ws`) and health check (`/health`)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use versus_server::{ClientEvent, Gateway, ServerEvent, SessionRegistry};
//!
//! let gateway = Gateway::new(Arc::new(SessionRegistry::new()));
//! let (host, mut inbox) = gateway.connect();
//! gateway.handle(host, ClientEvent::Create);
//!
//! assert!(matches!(inbox.try_recv(), Ok(ServerEvent::Created { .. })));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod gateway;
mod http;
mod ids;
mod registry;
mod session;

pub use config::{ConfigError, ConfigOverrides, ServerConfig};
pub use error::{RegistryError, SessionError};
pub use gateway::{
    ALREADY_IN_GAME_MESSAGE, Binding, ClientEvent, Gateway, NOT_IN_GAME_MESSAGE,
    PEER_LEFT_MESSAGE, ServerEvent,
};
pub use http::{AppState, Health, router, serve};
pub use ids::{DEFAULT_ID_LENGTH, ParticipantId, SessionId};
pub use registry::{MAX_ID_ATTEMPTS, Removal, SessionRegistry, spawn_reaper};
pub use session::{Departure, Players, Session, SessionSnapshot, SessionStatus};

pub use versus_tictactoe::{Board, Cell, Mark, Outcome, Winner};
