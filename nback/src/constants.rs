//! Game constants: grid, alphabet, trial counts, timing and generation rates.
//!
//! The generation rates follow the Jaeggi-mode defaults popularized by
//! Brain Workshop: roughly 30% of scorable trials match per channel, with at
//! most two trials where position and letter match together.

/// Side length of the square position grid (3 → 9 cells).
pub const GRID_SIZE: usize = 3;

/// Default letter alphabet. Chosen to be audibly distinct when spoken.
pub const LETTERS: [char; 8] = ['c', 'h', 'k', 'l', 'q', 'r', 's', 't'];

/// Scorable trials per play-through; the total adds N seed trials on top.
pub const BASE_TRIAL_COUNT: usize = 20;

/// Smallest N offered to players.
pub const N_MIN: usize = 1;

/// Largest N offered to players.
pub const N_MAX: usize = 9;

/// Default N.
pub const DEFAULT_N: usize = 2;

/// Stimulus display time per trial, in milliseconds.
pub const TRIAL_DURATION_MS: u64 = 3000;

/// Pause between two trials, in milliseconds.
pub const PAUSE_DURATION_MS: u64 = 100;

/// Fraction of scorable trials that should match, per channel.
pub const MATCH_RATE: f64 = 0.30;

/// Fraction of scorable trials where both channels match at once.
pub const BOTH_RATE: f64 = 0.10;

/// Upper bound on simultaneous position+letter matches.
pub const MAX_BOTH_MATCHES: usize = 2;

/// Per-trial chance of an early match while a channel is still short.
pub const CHANCE_OF_GUARANTEED_MATCH: f64 = 0.125;

/// Per-trial chance of inserting a near-miss lure.
pub const CHANCE_OF_INTERFERENCE: f64 = 0.125;

/// Generate-and-verify attempts before settling for a best-effort sequence.
pub const MAX_GENERATION_ATTEMPTS: usize = 1000;

/// Total trial count for a given N: seed trials plus the scorable ones.
#[inline(always)]
pub fn total_trials(n: usize) -> usize {
    BASE_TRIAL_COUNT + n
}

/// Whether N lies in the range offered to players.
#[inline(always)]
pub fn is_supported_n(n: usize) -> bool {
    (N_MIN..=N_MAX).contains(&n)
}
