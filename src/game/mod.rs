//! Game Logic Module
//!
//! The deterministic half of the server. Everything here is plain state
//! plus pure functions of it: no I/O, no clocks, no logging. The network
//! layer feeds events in and carries [`coordinator::Outcome`]s out.
//!
//! ## Module Structure
//!
//! - `feedback`: Positional guess scoring
//! - `rng`: Seeded turn randomness
//! - `session`: Seats, secrets, turn pointer, phase
//! - `coordinator`: The event-driven duel state machine

pub mod feedback;
pub mod rng;
pub mod session;
pub mod coordinator;

// Re-export key types
pub use coordinator::{Delivery, GameCoordinator, GameError, Outcome, Route, TimerDirective};
pub use feedback::{score_guess, Feedback, WINNING_FEEDBACK};
pub use rng::{derive_session_seed, TurnRng};
pub use session::{DuelSession, GamePhase, Participant, ParticipantId, MAX_PARTICIPANTS};
