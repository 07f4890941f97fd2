//! Protocol Events
//!
//! Wire format for client-server communication over WebSocket.
//! Every event is a JSON text frame tagged by an `event` field,
//! with any payload fields flattened alongside the tag.

use serde::{Serialize, Deserialize};

// =============================================================================
// CLIENT -> SERVER EVENTS
// =============================================================================

/// Events sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Confirm readiness under a display name.
    Ready(ReadyPayload),

    /// Submit the secret number for this round.
    SubmitSecret(SecretSubmission),

    /// Guess the opponent's secret.
    MakeGuess(GuessSubmission),

    /// Ask for a fresh round without reconnecting.
    PlayAgain,
}

/// Readiness confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Display name shown to the opponent.
    pub name: String,
}

/// Secret number submission.
///
/// Kept as a string: leading zeros are significant and the scorer
/// compares characters, not numeric value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretSubmission {
    /// The secret digits.
    pub number: String,
}

/// A guess at the opponent's secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessSubmission {
    /// The guessed digits.
    pub guess: String,
}

// =============================================================================
// SERVER -> CLIENT EVENTS
// =============================================================================

/// Events sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Someone was seated; carries the new headcount.
    PlayerJoined(RosterUpdate),

    /// Someone left; carries the remaining headcount.
    PlayerLeft(RosterUpdate),

    /// Status text while the table is not ready to play.
    Waiting(WaitingNotice),

    /// Enter (or re-enter) the guessing stage.
    GuessStage,

    /// It is the recipient's turn to guess.
    YourTurn,

    /// The named opponent is taking their turn.
    OpponentTurn(TurnHolder),

    /// Score for the recipient's own guess.
    Feedback(GuessFeedback),

    /// Score and digits of the opponent's latest guess.
    OpponentGuess(OpponentReport),

    /// The recipient won the round.
    Win,

    /// The recipient lost the round.
    Lose,

    /// Something went wrong handling the recipient's last event.
    Error(ErrorNotice),
}

/// Headcount after a seating change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    /// Participants currently seated.
    pub player_count: usize,
}

/// Human-readable status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingNotice {
    /// Status text.
    pub message: String,
}

/// Who holds the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnHolder {
    /// Display name of the turn holder.
    pub name: String,
}

/// Feedback on the recipient's own guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessFeedback {
    /// Rendered score, e.g. `"+2 -1"`.
    pub feedback: String,
    /// The digits that were guessed.
    pub guess: String,
}

/// Feedback on an opponent's guess, attributed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentReport {
    /// Rendered score, e.g. `"+2 -1"`.
    pub feedback: String,
    /// The digits that were guessed.
    pub guess: String,
    /// Display name of the guesser.
    pub name: String,
}

/// Error report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNotice {
    /// Human-readable message.
    pub message: String,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientEvent {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerEvent {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// A `playerJoined` roster event.
    pub fn player_joined(player_count: usize) -> Self {
        Self::PlayerJoined(RosterUpdate { player_count })
    }

    /// A `playerLeft` roster event.
    pub fn player_left(player_count: usize) -> Self {
        Self::PlayerLeft(RosterUpdate { player_count })
    }

    /// A `waiting` status event.
    pub fn waiting(message: &str) -> Self {
        Self::Waiting(WaitingNotice { message: message.to_string() })
    }

    /// An `opponentTurn` event naming the holder.
    pub fn opponent_turn(name: &str) -> Self {
        Self::OpponentTurn(TurnHolder { name: name.to_string() })
    }

    /// A `feedback` event scoring the recipient's own guess.
    pub fn feedback(feedback: String, guess: &str) -> Self {
        Self::Feedback(GuessFeedback { feedback, guess: guess.to_string() })
    }

    /// An `opponentGuess` event reporting the other seat's guess.
    pub fn opponent_guess(feedback: String, guess: &str, name: &str) -> Self {
        Self::OpponentGuess(OpponentReport {
            feedback,
            guess: guess.to_string(),
            name: name.to_string(),
        })
    }

    /// An `error` event.
    pub fn error(message: &str) -> Self {
        Self::Error(ErrorNotice { message: message.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_json_roundtrip() {
        let event = ClientEvent::Ready(ReadyPayload { name: "ann".to_string() });

        let json = event.to_json().unwrap();
        let parsed = ClientEvent::from_json(&json).unwrap();

        if let ClientEvent::Ready(payload) = parsed {
            assert_eq!(payload.name, "ann");
        } else {
            panic!("Wrong event type");
        }
    }

    #[test]
    fn test_server_event_json_roundtrip() {
        let event = ServerEvent::opponent_guess("+2 -1".to_string(), "1243", "ben");

        let json = event.to_json().unwrap();
        let parsed = ServerEvent::from_json(&json).unwrap();

        if let ServerEvent::OpponentGuess(report) = parsed {
            assert_eq!(report.feedback, "+2 -1");
            assert_eq!(report.guess, "1243");
            assert_eq!(report.name, "ben");
        } else {
            panic!("Wrong event type");
        }
    }

    #[test]
    fn test_tag_and_field_spelling() {
        // Tags and payload keys are camelCase on the wire.
        let json = ServerEvent::player_joined(2).to_json().unwrap();
        assert!(json.contains(r#""event":"playerJoined""#));
        assert!(json.contains(r#""playerCount":2"#));

        let json = ClientEvent::SubmitSecret(SecretSubmission { number: "0042".to_string() })
            .to_json()
            .unwrap();
        assert!(json.contains(r#""event":"submitSecret""#));
        assert!(json.contains(r#""number":"0042""#));
    }

    #[test]
    fn test_unit_events_are_tag_only() {
        assert_eq!(ServerEvent::YourTurn.to_json().unwrap(), r#"{"event":"yourTurn"}"#);
        assert_eq!(ServerEvent::GuessStage.to_json().unwrap(), r#"{"event":"guessStage"}"#);
        assert_eq!(ServerEvent::Win.to_json().unwrap(), r#"{"event":"win"}"#);
        assert_eq!(ClientEvent::PlayAgain.to_json().unwrap(), r#"{"event":"playAgain"}"#);
    }

    #[test]
    fn test_parse_client_events() {
        let parsed = ClientEvent::from_json(r#"{"event":"makeGuess","guess":"1234"}"#).unwrap();
        if let ClientEvent::MakeGuess(submission) = parsed {
            assert_eq!(submission.guess, "1234");
        } else {
            panic!("Wrong event type");
        }

        let parsed = ClientEvent::from_json(r#"{"event":"playAgain"}"#).unwrap();
        assert!(matches!(parsed, ClientEvent::PlayAgain));
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(ClientEvent::from_json(r#"{"event":"teleport"}"#).is_err());
        assert!(ClientEvent::from_json(r#"{"name":"ann"}"#).is_err());
        assert!(ClientEvent::from_json("not json at all").is_err());
    }

    #[test]
    fn test_missing_payload_field_rejected() {
        assert!(ClientEvent::from_json(r#"{"event":"ready"}"#).is_err());
        assert!(ClientEvent::from_json(r#"{"event":"submitSecret","guess":"1"}"#).is_err());
    }

    #[test]
    fn test_secret_keeps_leading_zeros() {
        let parsed =
            ClientEvent::from_json(r#"{"event":"submitSecret","number":"0012"}"#).unwrap();
        if let ClientEvent::SubmitSecret(submission) = parsed {
            assert_eq!(submission.number, "0012");
        } else {
            panic!("Wrong event type");
        }
    }

    #[test]
    fn test_server_event_variants() {
        let events = vec![
            ServerEvent::player_joined(1),
            ServerEvent::player_left(0),
            ServerEvent::waiting("Waiting for another player to join."),
            ServerEvent::GuessStage,
            ServerEvent::YourTurn,
            ServerEvent::opponent_turn("ann"),
            ServerEvent::feedback("+4 -0".to_string(), "1234"),
            ServerEvent::opponent_guess("+0 -4".to_string(), "4321", "ben"),
            ServerEvent::Win,
            ServerEvent::Lose,
            ServerEvent::error("An error occurred while processing your request."),
        ];

        for event in events {
            let json = event.to_json().unwrap();
            let _ = ServerEvent::from_json(&json).unwrap();
        }
    }
}
