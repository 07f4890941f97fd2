//! Duel Coordination
//!
//! The event-driven state machine for the duel. Each inbound event is
//! checked against a single phase-admission table, applied to the
//! session, and turned into an [`Outcome`]: the deliveries the transport
//! should fan out plus a wait-timer instruction. No I/O happens here -
//! the network layer executes outcomes and owns the clock.

use crate::game::feedback::score_guess;
use crate::game::rng::TurnRng;
use crate::game::session::{DuelSession, GamePhase, ParticipantId, MAX_PARTICIPANTS};
use crate::network::protocol::ServerEvent;

/// Status text while a lone ready participant waits for an opponent.
pub const WAITING_FOR_OPPONENT: &str = "Waiting for another player to join.";

/// Status text when the wait window lapses or a participant leaves
/// mid-wait.
pub const NOT_ENOUGH_PLAYERS: &str = "Not enough players. Please try again later.";

/// Where a delivery goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// One participant.
    To(ParticipantId),
    /// Every seated participant, sender included.
    All,
    /// Every seated participant except one.
    AllExcept(ParticipantId),
}

/// One event bound for one route.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Destination.
    pub route: Route,
    /// Event to send.
    pub event: ServerEvent,
}

impl Delivery {
    /// Unicast to one participant.
    pub fn to(id: ParticipantId, event: ServerEvent) -> Self {
        Self { route: Route::To(id), event }
    }

    /// Broadcast to everyone seated.
    pub fn all(event: ServerEvent) -> Self {
        Self { route: Route::All, event }
    }

    /// Broadcast to everyone seated except `id`.
    pub fn all_except(id: ParticipantId, event: ServerEvent) -> Self {
        Self { route: Route::AllExcept(id), event }
    }
}

/// What the transport should do with the wait-window timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerDirective {
    /// Leave the timer alone.
    #[default]
    None,
    /// Start the wait window, aborting any window already running.
    Arm,
    /// Stop a running wait window.
    Cancel,
}

/// Result of applying one event to the session.
#[derive(Clone, Debug, Default)]
pub struct Outcome {
    /// Events to deliver, in order.
    pub deliveries: Vec<Delivery>,
    /// Timer instruction for the transport.
    pub timer: TimerDirective,
}

impl Outcome {
    /// Nothing to deliver, no timer change.
    pub fn silent() -> Self {
        Self::default()
    }
}

/// Internal coordination faults.
///
/// Validation misses are not errors - they come back as silent outcomes.
/// These variants mark invariant breaches that a healthy session never
/// produces; the transport logs them and notifies only the caller.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The guessing phase has no turn holder.
    #[error("No turn holder in guessing phase")]
    TurnHolderMissing,

    /// The acting participant has no seated opponent.
    #[error("Opponent not seated")]
    OpponentMissing,

    /// The opponent never submitted a secret.
    #[error("Opponent secret missing")]
    SecretMissing,
}

/// Kinds of phase-gated inbound events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventKind {
    Ready,
    SubmitSecret,
    Guess,
    WaitExpiry,
}

/// The phase-admission table. Connect, disconnect and play-again are
/// heard in every phase; everything else outside this table is silently
/// ignored.
fn admits(phase: GamePhase, kind: EventKind) -> bool {
    use EventKind::*;
    use GamePhase::*;

    matches!(
        (phase, kind),
        (Empty, Ready)
            | (AwaitingReady, Ready)
            | (AwaitingReady, SubmitSecret)
            | (AwaitingSecrets, SubmitSecret)
            | (Guessing, Guess)
            | (AwaitingReady, WaitExpiry)
    )
}

/// The duel state machine.
///
/// Owns the session and the turn rng. Handlers validate an inbound
/// event, mutate the session, and return the deliveries the transport
/// should fan out. Deterministic for a fixed seed and event order.
#[derive(Debug)]
pub struct GameCoordinator {
    session: DuelSession,
    rng: TurnRng,
}

impl GameCoordinator {
    /// Create a coordinator with the given turn seed.
    pub fn new(seed: u64) -> Self {
        Self { session: DuelSession::new(), rng: TurnRng::new(seed) }
    }

    /// Read access to the session.
    pub fn session(&self) -> &DuelSession {
        &self.session
    }

    /// Seat a new connection and announce the headcount.
    pub fn connect(&mut self, id: ParticipantId) -> Result<Outcome, GameError> {
        if !self.session.add_participant(id) {
            return Ok(Outcome::silent());
        }

        Ok(Outcome {
            deliveries: vec![Delivery::all(ServerEvent::player_joined(
                self.session.participant_count(),
            ))],
            timer: TimerDirective::None,
        })
    }

    /// Confirm readiness under a display name.
    ///
    /// The first confirmation opens the wait window; the second closes it
    /// and moves the table to secret collection.
    pub fn ready(&mut self, id: ParticipantId, name: &str) -> Result<Outcome, GameError> {
        if !self.session.is_participant(&id) || !admits(self.session.phase(), EventKind::Ready) {
            return Ok(Outcome::silent());
        }

        self.session.set_name(&id, name);
        let confirmations = self.session.record_ready();

        if confirmations < 2 {
            self.session.set_phase(GamePhase::AwaitingReady);
            return Ok(Outcome {
                deliveries: vec![Delivery::all(ServerEvent::waiting(WAITING_FOR_OPPONENT))],
                timer: TimerDirective::Arm,
            });
        }

        self.session.set_phase(GamePhase::AwaitingSecrets);
        Ok(Outcome {
            deliveries: vec![Delivery::all(ServerEvent::GuessStage)],
            timer: TimerDirective::Cancel,
        })
    }

    /// Record a secret number; the round starts once both are in.
    pub fn submit_secret(&mut self, id: ParticipantId, number: &str) -> Result<Outcome, GameError> {
        if !self.session.is_participant(&id)
            || !admits(self.session.phase(), EventKind::SubmitSecret)
        {
            return Ok(Outcome::silent());
        }

        self.session.record_secret(id, number.chars().collect());
        if !self.session.all_secrets_in() {
            return Ok(Outcome::silent());
        }

        let opener = self.rng.next_index(MAX_PARTICIPANTS);
        self.session.set_turn(opener);
        self.session.set_phase(GamePhase::Guessing);

        // Turn notices go out first, then the stage signal is broadcast a
        // second time to mark the start of guessing.
        let mut deliveries = self.turn_notices()?;
        deliveries.push(Delivery::all(ServerEvent::GuessStage));
        Ok(Outcome { deliveries, timer: TimerDirective::None })
    }

    /// Score a guess from the turn holder against the opponent's secret.
    ///
    /// Guesses from the other seat are dropped without any state change
    /// or delivery.
    pub fn guess(&mut self, id: ParticipantId, digits: &str) -> Result<Outcome, GameError> {
        if !self.session.is_participant(&id) || !admits(self.session.phase(), EventKind::Guess) {
            return Ok(Outcome::silent());
        }

        let holder = self
            .session
            .current_turn_participant()
            .ok_or(GameError::TurnHolderMissing)?;
        if holder.id != id {
            return Ok(Outcome::silent());
        }
        let guesser_name = holder.name.clone();

        let opponent = self.session.opponent_of(&id).ok_or(GameError::OpponentMissing)?;
        let opponent_id = opponent.id;
        let secret = self.session.secret(&opponent_id).ok_or(GameError::SecretMissing)?;

        let guess: Vec<char> = digits.chars().collect();
        let feedback = score_guess(secret, &guess);
        let rendered = feedback.render();

        let mut deliveries = vec![
            Delivery::to(id, ServerEvent::feedback(rendered.clone(), digits)),
            Delivery::all_except(id, ServerEvent::opponent_guess(rendered, digits, &guesser_name)),
        ];

        if feedback.is_winning() {
            deliveries.push(Delivery::to(id, ServerEvent::Win));
            deliveries.push(Delivery::all_except(id, ServerEvent::Lose));
            // Finished is transient; the reset puts the table back to
            // Empty with everyone still seated.
            self.session.set_phase(GamePhase::Finished);
            self.session.reset();
            return Ok(Outcome { deliveries, timer: TimerDirective::None });
        }

        self.session.advance_turn();
        deliveries.extend(self.turn_notices()?);
        Ok(Outcome { deliveries, timer: TimerDirective::None })
    }

    /// Unseat a leaving connection.
    ///
    /// Mid-round departures that leave fewer than two seats reset the
    /// round; a departure during the wait window cancels the timer.
    pub fn disconnect(&mut self, id: ParticipantId) -> Result<Outcome, GameError> {
        if !self.session.remove_participant(&id) {
            return Ok(Outcome::silent());
        }

        let remaining = self.session.participant_count();
        let mut deliveries = vec![Delivery::all(ServerEvent::player_left(remaining))];
        let phase = self.session.phase();

        let in_progress = matches!(phase, GamePhase::AwaitingSecrets | GamePhase::Guessing);
        if remaining < MAX_PARTICIPANTS && in_progress {
            // No win or loss is declared for a walkover.
            self.session.reset();
            return Ok(Outcome { deliveries, timer: TimerDirective::None });
        }

        if phase == GamePhase::AwaitingReady {
            if remaining == 1 {
                deliveries.push(Delivery::all(ServerEvent::waiting(NOT_ENOUGH_PLAYERS)));
            }
            return Ok(Outcome { deliveries, timer: TimerDirective::Cancel });
        }

        Ok(Outcome { deliveries, timer: TimerDirective::None })
    }

    /// Reset the round on request, keeping everyone seated. Valid in any
    /// phase, mid-round included.
    pub fn play_again(&mut self, id: ParticipantId) -> Result<Outcome, GameError> {
        if !self.session.is_participant(&id) {
            return Ok(Outcome::silent());
        }

        self.session.reset();
        Ok(Outcome {
            deliveries: vec![Delivery::all(ServerEvent::player_joined(
                self.session.participant_count(),
            ))],
            timer: TimerDirective::None,
        })
    }

    /// The wait window ran out with only one ready confirmation.
    ///
    /// Expiries landing in any other phase are stale timers and dropped.
    pub fn wait_window_elapsed(&mut self) -> Result<Outcome, GameError> {
        if !admits(self.session.phase(), EventKind::WaitExpiry) {
            return Ok(Outcome::silent());
        }

        Ok(Outcome {
            deliveries: vec![Delivery::all(ServerEvent::waiting(NOT_ENOUGH_PLAYERS))],
            timer: TimerDirective::None,
        })
    }

    /// `yourTurn` to the holder, `opponentTurn{name}` to the other seat.
    fn turn_notices(&self) -> Result<Vec<Delivery>, GameError> {
        let holder = self
            .session
            .current_turn_participant()
            .ok_or(GameError::TurnHolderMissing)?;
        let other = self.session.opponent_of(&holder.id).ok_or(GameError::OpponentMissing)?;

        Ok(vec![
            Delivery::to(holder.id, ServerEvent::YourTurn),
            Delivery::to(other.id, ServerEvent::opponent_turn(&holder.name)),
        ])
    }
}
