//! # Digit Duel Server
//!
//! Real-time two-player "guess the secret number" duels over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DIGIT DUEL SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Game logic (deterministic)                │
//! │  ├── feedback.rs - Positional guess scoring                  │
//! │  ├── rng.rs      - Seeded Xorshift128+ turn RNG              │
//! │  ├── session.rs  - Seats, secrets, phase, turn pointer       │
//! │  └── coordinator.rs- The duel state machine                  │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - JSON event types                          │
//! │  ├── port.rs     - First-free-port probing                   │
//! │  └── server.rs   - WebSocket server + coordinator task       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! All game state lives inside one coordinator task. Connection tasks
//! parse frames and forward commands over a channel; the coordinator
//! applies each command to completion before taking the next, so
//! handlers never observe half-applied state. The wait window is a
//! spawned sleep that posts its expiry back into the same channel,
//! which keeps timer handling serialized with everything else.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::time::Duration;

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::coordinator::{GameCoordinator, Outcome};
pub use game::feedback::{score_guess, Feedback, WINNING_FEEDBACK};
pub use game::session::{DuelSession, GamePhase, ParticipantId};
pub use network::protocol::{ClientEvent, ServerEvent};
pub use network::server::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// First port the bind probe tries
pub const DEFAULT_START_PORT: u16 = 3010;

/// How long a lone ready participant waits for an opponent
pub const WAIT_WINDOW: Duration = Duration::from_secs(5);
