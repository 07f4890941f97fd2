//! Guess Feedback Scoring
//!
//! Positional and containment scoring for secret-number guesses.
//! Pure functions only - no I/O, no logging, no shared state.

/// Rendered feedback that ends the round: every digit of a four-digit
/// secret matched in place.
pub const WINNING_FEEDBACK: &str = "+4 -0";

/// Scored feedback for one guess.
///
/// Rendered on the wire as `+<positives> -<negatives>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Feedback {
    /// Guess digits matching the secret at the same position.
    pub positives: usize,
    /// Secret digits found elsewhere in the guess.
    pub negatives: usize,
}

impl Feedback {
    /// Render as the wire string, e.g. `+2 -1`.
    pub fn render(&self) -> String {
        format!("+{} -{}", self.positives, self.negatives)
    }

    /// Whether this feedback ends the round.
    ///
    /// Compared as the rendered string, so only a clean `+4 -0` wins;
    /// a five-digit secret scoring `+4 -1` does not.
    pub fn is_winning(&self) -> bool {
        self.render() == WINNING_FEEDBACK
    }
}

/// Score a guess against a secret.
///
/// Walks the secret by position: an exact positional match counts as a
/// positive, otherwise a secret digit found anywhere in the guess counts
/// as a negative. The containment check looks up the *secret* digit in
/// the guess, so with repeated digits one guess digit can count toward
/// several secret positions. Unequal lengths are fine - positions past
/// the end of the guess simply never match positionally.
///
/// # Example
///
/// ```
/// use digit_duel::game::feedback::score_guess;
///
/// let secret: Vec<char> = "1234".chars().collect();
/// let guess: Vec<char> = "1243".chars().collect();
/// assert_eq!(score_guess(&secret, &guess).render(), "+2 -2");
/// ```
pub fn score_guess(secret: &[char], guess: &[char]) -> Feedback {
    let mut positives = 0;
    let mut negatives = 0;

    for (index, digit) in secret.iter().enumerate() {
        if guess.get(index) == Some(digit) {
            positives += 1;
        } else if guess.contains(digit) {
            negatives += 1;
        }
    }

    Feedback { positives, negatives }
}

// =============================================================================
// TESTS
// =============================================================================
