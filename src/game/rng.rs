//! Turn Randomization
//!
//! Deterministic PRNG for picking the opening turn, seeded once per
//! process. Uses Xorshift128+ - given the same seed, produces the
//! identical sequence on all platforms.

use sha2::{Digest, Sha256};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use digit_duel::game::rng::TurnRng;
///
/// let mut rng = TurnRng::new(12345);
/// assert_eq!(rng.next_u64(), 6233086606872742541); // same on every platform
/// ```
#[derive(Clone, Debug)]
pub struct TurnRng {
    state: [u64; 2],
}

impl Default for TurnRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TurnRng {
    /// Create an RNG from a 64-bit seed.
    ///
    /// The state is expanded through SplitMix64 so that small or
    /// sequential seeds still start well-distributed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift state must not be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random index in range [0, len).
    ///
    /// Returns 0 for an empty range.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large len, but acceptable
        (self.next_u64() % len as u64) as usize
    }
}

/// SplitMix64 step, used only to expand the seed into state.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the per-process seed for opening-turn selection.
///
/// Hashes a domain separator, the current wall clock, and the process id,
/// taking the first 8 bytes of the digest as the seed.
pub fn derive_session_seed() -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"DIGIT_DUEL_SEED_V1");

    // Wall clock (nanosecond resolution where available)
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    hasher.update(nanos.to_le_bytes());

    // Process id
    hasher.update(std::process::id().to_le_bytes());

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap_or_default())
}

// =============================================================================
// TESTS
// =============================================================================
