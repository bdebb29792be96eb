//! Core data structures: stimuli, trials, sequences and configuration.
//!
//! A [`Sequence`] is built once per play-through (by
//! [`crate::generator::generate`] or [`Sequence::from_stimuli`]) and is
//! read-only afterwards. Its per-trial match flags always agree with the
//! literal N-back comparison:
//!
//! - `visual_match(i) == (position[i] == position[i - n])` for i ≥ n
//! - `audio_match(i) == (letter[i] == letter[i - n])` for i ≥ n
//! - the first n trials (seed trials) carry no marks at all.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{NBackError, Result};

/// A spoken letter.
pub type Letter = char;

/// Grid cell (row, col), each coordinate in `[0, grid_size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Stimulus stream a participant responds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Grid position.
    Visual,
    /// Spoken letter.
    Audio,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Visual, Channel::Audio];
}

/// What one channel of a trial is, relative to its history.
///
/// `Match` and `Lure` are exclusive by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mark {
    /// Neither a match nor a deliberate near miss.
    #[default]
    Plain,
    /// Stimulus equals the one exactly N trials back.
    Match,
    /// Stimulus copies the one `lag` trials back (N-1 or N+1), and differs
    /// from the N-back stimulus.
    Lure { lag: usize },
}

impl Mark {
    #[inline(always)]
    pub fn is_match(self) -> bool {
        matches!(self, Mark::Match)
    }

    #[inline(always)]
    pub fn is_lure(self) -> bool {
        matches!(self, Mark::Lure { .. })
    }

    pub fn lure_lag(self) -> Option<usize> {
        match self {
            Mark::Lure { lag } => Some(lag),
            _ => None,
        }
    }
}

/// One trial: a position shown together with a spoken letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Trial {
    pub position: Position,
    pub letter: Letter,
    pub visual: Mark,
    pub audio: Mark,
}

impl Trial {
    /// Seed trial: no history, so no marks.
    pub fn seed(position: Position, letter: Letter) -> Self {
        Self {
            position,
            letter,
            visual: Mark::Plain,
            audio: Mark::Plain,
        }
    }

    pub fn visual_match(&self) -> bool {
        self.visual.is_match()
    }

    pub fn audio_match(&self) -> bool {
        self.audio.is_match()
    }

    pub fn visual_lure(&self) -> bool {
        self.visual.is_lure()
    }

    pub fn audio_lure(&self) -> bool {
        self.audio.is_lure()
    }

    pub fn both_match(&self) -> bool {
        self.visual_match() && self.audio_match()
    }

    pub fn mark(&self, channel: Channel) -> Mark {
        match channel {
            Channel::Visual => self.visual,
            Channel::Audio => self.audio,
        }
    }

    pub fn is_match(&self, channel: Channel) -> bool {
        self.mark(channel).is_match()
    }
}

/// Ordered, read-only list of trials for one play-through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sequence {
    n: usize,
    trials: Vec<Trial>,
}

impl Sequence {
    /// Assemble a sequence from trials whose marks are already consistent.
    pub(crate) fn from_parts(n: usize, trials: Vec<Trial>) -> Self {
        debug_assert!(trials.len() > n);
        Self { n, trials }
    }

    /// Build a sequence from raw stimuli, stamping match marks by literal
    /// N-back comparison. No trial is marked as a lure.
    pub fn from_stimuli(n: usize, stimuli: &[(Position, Letter)]) -> Result<Self> {
        if n == 0 {
            return Err(NBackError::invalid_configuration("n must be >= 1"));
        }
        if stimuli.len() <= n {
            return Err(NBackError::invalid_configuration(format!(
                "need more than n={} stimuli, got {}",
                n,
                stimuli.len()
            )));
        }

        let trials = stimuli
            .iter()
            .enumerate()
            .map(|(i, &(position, letter))| {
                let mut trial = Trial::seed(position, letter);
                if i >= n {
                    let (back_pos, back_letter) = stimuli[i - n];
                    if position == back_pos {
                        trial.visual = Mark::Match;
                    }
                    if letter == back_letter {
                        trial.audio = Mark::Match;
                    }
                }
                trial
            })
            .collect();

        Ok(Self { n, trials })
    }

    /// The N-back lag this sequence was built for.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Trial> {
        self.trials.get(index)
    }

    pub fn match_count(&self, channel: Channel) -> usize {
        self.trials.iter().filter(|t| t.is_match(channel)).count()
    }

    pub fn lure_count(&self, channel: Channel) -> usize {
        self.trials
            .iter()
            .filter(|t| t.mark(channel).is_lure())
            .count()
    }

    pub fn both_match_count(&self) -> usize {
        self.trials.iter().filter(|t| t.both_match()).count()
    }

    /// Realized (visual, audio, both) match counts.
    pub fn match_counts(&self) -> MatchCounts {
        MatchCounts {
            visual: self.match_count(Channel::Visual),
            audio: self.match_count(Channel::Audio),
            both: self.both_match_count(),
        }
    }
}

/// Visual, audio and simultaneous match counts, either targeted or realized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub visual: usize,
    pub audio: usize,
    pub both: usize,
}

impl MatchCounts {
    /// Sum of absolute per-count differences; 0 means an exact hit.
    pub fn distance(&self, other: &MatchCounts) -> usize {
        self.visual.abs_diff(other.visual)
            + self.audio.abs_diff(other.audio)
            + self.both.abs_diff(other.both)
    }
}

/// Probabilities steering the per-trial stimulus policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRates {
    /// Fraction of scorable trials that match, per channel.
    pub match_rate: f64,
    /// Fraction of scorable trials matching on both channels.
    pub both_rate: f64,
    /// Cap on simultaneous matches.
    pub max_both: usize,
    /// Chance of an early match while a channel is short of its target.
    pub guaranteed_match_chance: f64,
    /// Chance of a near-miss lure on a non-matching trial.
    pub interference_chance: f64,
}

impl Default for GenerationRates {
    fn default() -> Self {
        Self {
            match_rate: MATCH_RATE,
            both_rate: BOTH_RATE,
            max_both: MAX_BOTH_MATCHES,
            guaranteed_match_chance: CHANCE_OF_GUARANTEED_MATCH,
            interference_chance: CHANCE_OF_INTERFERENCE,
        }
    }
}

/// Everything the generator needs for one sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub n: usize,
    pub total_trials: usize,
    pub grid_size: usize,
    pub alphabet: Vec<Letter>,
    pub rates: GenerationRates,
    pub max_attempts: usize,
}

impl GeneratorConfig {
    /// Default game for a given N: 3×3 grid, 8 letters, 20 + N trials.
    pub fn for_n(n: usize) -> Self {
        Self {
            n,
            total_trials: total_trials(n),
            grid_size: GRID_SIZE,
            alphabet: LETTERS.to_vec(),
            rates: GenerationRates::default(),
            max_attempts: MAX_GENERATION_ATTEMPTS,
        }
    }

    /// Number of scorable (non-seed) trials.
    pub fn scorable_trials(&self) -> usize {
        self.total_trials.saturating_sub(self.n)
    }

    /// Check every precondition of [`crate::generator::generate`].
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(NBackError::invalid_configuration("n must be >= 1"));
        }
        if self.total_trials <= self.n {
            return Err(NBackError::invalid_configuration(format!(
                "total_trials ({}) must exceed n ({})",
                self.total_trials, self.n
            )));
        }
        if self.grid_size < 2 {
            return Err(NBackError::invalid_configuration(format!(
                "grid_size must be >= 2, got {}",
                self.grid_size
            )));
        }
        if self.alphabet.len() < 2 {
            return Err(NBackError::invalid_configuration(format!(
                "alphabet needs at least 2 letters, got {}",
                self.alphabet.len()
            )));
        }
        for (i, a) in self.alphabet.iter().enumerate() {
            if self.alphabet[i + 1..].contains(a) {
                return Err(NBackError::invalid_configuration(format!(
                    "alphabet letter '{a}' appears more than once"
                )));
            }
        }
        let rates = [
            ("match_rate", self.rates.match_rate),
            ("both_rate", self.rates.both_rate),
            ("guaranteed_match_chance", self.rates.guaranteed_match_chance),
            ("interference_chance", self.rates.interference_chance),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(NBackError::invalid_configuration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.max_attempts == 0 {
            return Err(NBackError::invalid_configuration(
                "max_attempts must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Wall-clock timing of a play-through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// How long each trial's response window stays open.
    pub trial: Duration,
    /// Gap between one trial's window closing and the next trial appearing.
    pub pause: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            trial: Duration::from_millis(TRIAL_DURATION_MS),
            pause: Duration::from_millis(PAUSE_DURATION_MS),
        }
    }
}
