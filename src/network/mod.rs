//! Network Layer
//!
//! WebSocket transport for the duel.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod port;
pub mod protocol;
pub mod server;

pub use port::{bind_first_available, ProbeError, PROBE_SPAN};
pub use protocol::{ClientEvent, ServerEvent};
pub use server::{GameServer, ServerConfig, GameServerError};
