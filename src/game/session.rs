//! Duel Session State
//!
//! In-memory state for the single two-seat session: who is seated, the
//! secrets they submitted, whose turn it is, and the phase of the round.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;

/// Maximum participants seated at once.
pub const MAX_PARTICIPANTS: usize = 2;

/// Unique participant identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(pub [u8; 16]);

impl ParticipantId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random identity for a new connection.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Phase of the duel round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GamePhase {
    /// Nobody has readied up this round.
    #[default]
    Empty,
    /// One ready confirmation in, waiting for the second.
    AwaitingReady,
    /// Both sides ready, collecting secret numbers.
    AwaitingSecrets,
    /// Both secrets in, guesses alternate.
    Guessing,
    /// A winning guess landed. Transient: set and cleared inside the same
    /// handler, never observable between events.
    Finished,
}

/// A seated participant.
#[derive(Clone, Debug)]
pub struct Participant {
    /// Unique identity, assigned at connect.
    pub id: ParticipantId,
    /// Display name, set at ready. Empty until then.
    pub name: String,
}

/// The one in-memory duel session.
///
/// Created at server start, lives for the whole process, and is reset in
/// place between rounds. Purely synchronous bookkeeping; state-machine
/// validation lives in the coordinator.
#[derive(Clone, Debug, Default)]
pub struct DuelSession {
    /// Seated participants in join order. The seat index drives turn math.
    participants: Vec<Participant>,
    /// Submitted secrets, keyed by owner.
    secrets: BTreeMap<ParticipantId, Vec<char>>,
    /// Seat index of whose guess is accepted. `None` outside `Guessing`.
    turn: Option<usize>,
    /// Ready confirmations this round.
    ready_count: u8,
    /// Current phase.
    phase: GamePhase,
}

impl DuelSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a participant. Returns false when the table is full or the
    /// identity is already seated.
    pub fn add_participant(&mut self, id: ParticipantId) -> bool {
        if self.participants.len() >= MAX_PARTICIPANTS || self.is_participant(&id) {
            return false;
        }
        self.participants.push(Participant { id, name: String::new() });
        true
    }

    /// Unseat a participant, purging their secret. Returns false for
    /// identities that were never seated.
    pub fn remove_participant(&mut self, id: &ParticipantId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != *id);
        if self.participants.len() == before {
            return false;
        }
        self.secrets.remove(id);
        true
    }

    /// Whether this identity is seated.
    pub fn is_participant(&self, id: &ParticipantId) -> bool {
        self.participants.iter().any(|p| p.id == *id)
    }

    /// Set a participant's display name.
    pub fn set_name(&mut self, id: &ParticipantId, name: &str) {
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == *id) {
            p.name = name.to_string();
        }
    }

    /// Record a secret. Resubmitting before the round starts overwrites.
    pub fn record_secret(&mut self, id: ParticipantId, digits: Vec<char>) {
        self.secrets.insert(id, digits);
    }

    /// The submitted secret for an identity.
    pub fn secret(&self, id: &ParticipantId) -> Option<&[char]> {
        self.secrets.get(id).map(|s| s.as_slice())
    }

    /// Whether a full table has submitted all secrets.
    pub fn all_secrets_in(&self) -> bool {
        self.participants.len() == MAX_PARTICIPANTS
            && self.participants.iter().all(|p| self.secrets.contains_key(&p.id))
    }

    /// The participant holding the turn.
    pub fn current_turn_participant(&self) -> Option<&Participant> {
        self.turn.and_then(|i| self.participants.get(i))
    }

    /// The seated participant other than `id`.
    pub fn opponent_of(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id != *id)
    }

    /// Participant by identity.
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == *id)
    }

    /// Hand the turn to the other seat.
    pub fn advance_turn(&mut self) {
        if let Some(turn) = self.turn {
            self.turn = Some((turn + 1) % MAX_PARTICIPANTS);
        }
    }

    /// Point the turn at a seat index.
    pub fn set_turn(&mut self, index: usize) {
        self.turn = Some(index);
    }

    /// Current turn seat index.
    pub fn turn(&self) -> Option<usize> {
        self.turn
    }

    /// Set the phase.
    pub fn set_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Count a ready confirmation. One increment per call, no identity
    /// check - the same seat readying twice counts twice.
    pub fn record_ready(&mut self) -> u8 {
        self.ready_count = self.ready_count.saturating_add(1);
        self.ready_count
    }

    /// Ready confirmations so far this round.
    pub fn ready_count(&self) -> u8 {
        self.ready_count
    }

    /// Seated participant count.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Clear the round state. Secrets, turn, readiness and phase all
    /// reset; `participants` is left as-is, so seated players roll
    /// straight into the next round.
    pub fn reset(&mut self) {
        self.secrets.clear();
        self.turn = None;
        self.ready_count = 0;
        self.phase = GamePhase::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ParticipantId {
        ParticipantId::new([byte; 16])
    }

    #[test]
    fn test_add_remove_participant() {
        let mut session = DuelSession::new();

        assert!(session.add_participant(id(1)));
        assert_eq!(session.participant_count(), 1);

        assert!(session.remove_participant(&id(1)));
        assert_eq!(session.participant_count(), 0);
        assert!(!session.remove_participant(&id(1)));
    }

    #[test]
    fn test_session_full() {
        let mut session = DuelSession::new();
        assert!(session.add_participant(id(1)));
        assert!(session.add_participant(id(2)));

        assert!(!session.add_participant(id(3)));
        assert_eq!(session.participant_count(), 2);
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut session = DuelSession::new();
        assert!(session.add_participant(id(1)));
        assert!(!session.add_participant(id(1)));
        assert_eq!(session.participant_count(), 1);
    }

    #[test]
    fn test_removal_purges_secret() {
        let mut session = DuelSession::new();
        session.add_participant(id(1));
        session.record_secret(id(1), vec!['1', '2', '3', '4']);
        assert!(session.secret(&id(1)).is_some());

        session.remove_participant(&id(1));
        assert!(session.secret(&id(1)).is_none());
    }

    #[test]
    fn test_all_secrets_in_needs_full_table() {
        let mut session = DuelSession::new();
        session.add_participant(id(1));
        session.record_secret(id(1), vec!['1']);

        // One seat with a secret is not a full table.
        assert!(!session.all_secrets_in());

        session.add_participant(id(2));
        assert!(!session.all_secrets_in());

        session.record_secret(id(2), vec!['2']);
        assert!(session.all_secrets_in());
    }

    #[test]
    fn test_secret_overwrite() {
        let mut session = DuelSession::new();
        session.add_participant(id(1));
        session.record_secret(id(1), vec!['1', '1']);
        session.record_secret(id(1), vec!['2', '2']);

        assert_eq!(session.secret(&id(1)), Some(['2', '2'].as_slice()));
    }

    #[test]
    fn test_turn_flip() {
        let mut session = DuelSession::new();
        session.add_participant(id(1));
        session.add_participant(id(2));

        session.set_turn(0);
        assert_eq!(session.current_turn_participant().map(|p| p.id), Some(id(1)));

        session.advance_turn();
        assert_eq!(session.current_turn_participant().map(|p| p.id), Some(id(2)));

        session.advance_turn();
        assert_eq!(session.current_turn_participant().map(|p| p.id), Some(id(1)));
    }

    #[test]
    fn test_opponent_of() {
        let mut session = DuelSession::new();
        session.add_participant(id(1));
        session.add_participant(id(2));

        assert_eq!(session.opponent_of(&id(1)).map(|p| p.id), Some(id(2)));
        assert_eq!(session.opponent_of(&id(2)).map(|p| p.id), Some(id(1)));
    }

    #[test]
    fn test_reset_preserves_participants() {
        let mut session = DuelSession::new();
        session.add_participant(id(1));
        session.add_participant(id(2));
        session.set_name(&id(1), "ann");
        session.record_secret(id(1), vec!['1']);
        session.record_secret(id(2), vec!['2']);
        session.record_ready();
        session.record_ready();
        session.set_turn(1);
        session.set_phase(GamePhase::Guessing);

        session.reset();

        assert_eq!(session.participant_count(), 2);
        assert_eq!(session.participant(&id(1)).map(|p| p.name.as_str()), Some("ann"));
        assert!(session.secret(&id(1)).is_none());
        assert!(session.secret(&id(2)).is_none());
        assert_eq!(session.turn(), None);
        assert_eq!(session.ready_count(), 0);
        assert_eq!(session.phase(), GamePhase::Empty);
    }

    #[test]
    fn test_ready_counts_without_identity() {
        let mut session = DuelSession::new();
        assert_eq!(session.record_ready(), 1);
        assert_eq!(session.record_ready(), 2);
        assert_eq!(session.ready_count(), 2);
    }
}
