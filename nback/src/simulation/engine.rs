//! Simulation engine: generate a sequence and play it with a synthetic
//! participant.
//!
//! The session is stepped synchronously: every `ArmTimer` effect is expired
//! immediately with its own token, and responses are issued right after each
//! `Present`, while the trial's window is open. No clock is involved, so a
//! game costs microseconds and batches parallelize freely with rayon.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::time::Instant;

use crate::error::Result;
use crate::generator::generate;
use crate::lifecycle::{Effect, Session};
use crate::scoring::ScoreTally;
use crate::types::{Channel, GeneratorConfig, MatchCounts};

use super::participant::SimulatedParticipant;

/// Per-game outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameSummary {
    /// Whether the generator hit all match targets.
    pub exact: bool,
    pub attempts: usize,
    pub realized: MatchCounts,
    pub visual_lures: usize,
    pub audio_lures: usize,
    pub tally: ScoreTally,
}

/// Results of a batch simulation.
pub struct SimulationResult {
    pub games: Vec<GameSummary>,
    pub elapsed: std::time::Duration,
}

/// Drive `session` from its current effects to the end, letting
/// `participant` answer each trial. Returns the final tally.
pub fn play_session<R: Rng>(
    session: &mut Session,
    mut effects: Vec<Effect>,
    participant: &SimulatedParticipant,
    rng: &mut R,
) -> ScoreTally {
    loop {
        let mut next = Vec::new();
        for effect in effects {
            match effect {
                Effect::Present { .. } => {
                    if let Some(trial) = session.current_trial().copied() {
                        for channel in Channel::ALL {
                            if participant.responds(trial.mark(channel), rng) {
                                session.record_response(channel);
                            }
                        }
                    }
                }
                Effect::ArmTimer { token, .. } => next.extend(session.on_timer_expire(token)),
                Effect::Finished(tally) => return tally,
            }
        }
        if next.is_empty() {
            return session.score().copied().unwrap_or_default();
        }
        effects = next;
    }
}

/// Generate one sequence and play it through.
pub fn simulate_game<R: Rng>(
    config: &GeneratorConfig,
    participant: &SimulatedParticipant,
    rng: &mut R,
) -> Result<GameSummary> {
    let generation = generate(config, rng)?;
    let exact = generation.is_exact();
    let attempts = generation.attempts();
    let sequence = generation.into_sequence();
    let realized = sequence.match_counts();
    let visual_lures = sequence.lure_count(Channel::Visual);
    let audio_lures = sequence.lure_count(Channel::Audio);

    let mut session = Session::default();
    let effects = session.start(sequence);
    let tally = play_session(&mut session, effects, participant, rng);

    Ok(GameSummary {
        exact,
        attempts,
        realized,
        visual_lures,
        audio_lures,
        tally,
    })
}

/// Simulate `num_games` games in parallel. Game i uses seed `seed + i`, so
/// results do not depend on the thread count.
pub fn simulate_batch(
    config: &GeneratorConfig,
    participant: &SimulatedParticipant,
    num_games: usize,
    seed: u64,
) -> Result<SimulationResult> {
    config.validate()?;
    let start = Instant::now();

    let games = (0..num_games)
        .into_par_iter()
        .map(|i| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(i as u64));
            simulate_game(config, participant, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SimulationResult {
        games,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Phase;

    #[test]
    fn test_perfect_participant_scores_everything() {
        let cfg = GeneratorConfig::for_n(2);
        let mut rng = SmallRng::seed_from_u64(42);
        let game = simulate_game(&cfg, &SimulatedParticipant::PERFECT, &mut rng).unwrap();
        assert_eq!(game.tally.visual.correct as usize, game.realized.visual);
        assert_eq!(game.tally.audio.correct as usize, game.realized.audio);
        assert_eq!(game.tally.visual.missed + game.tally.visual.false_alarms, 0);
        assert_eq!(game.tally.audio.missed + game.tally.audio.false_alarms, 0);
        assert_eq!(game.tally.visual.percent(), 100);
    }

    #[test]
    fn test_silent_participant_misses_everything() {
        let cfg = GeneratorConfig::for_n(3);
        let mut rng = SmallRng::seed_from_u64(7);
        let game = simulate_game(&cfg, &SimulatedParticipant::SILENT, &mut rng).unwrap();
        assert_eq!(game.tally.visual.missed as usize, game.realized.visual);
        assert_eq!(game.tally.audio.missed as usize, game.realized.audio);
        assert_eq!(game.tally.visual.correct, 0);
        assert_eq!(game.tally.visual.percent(), 0);
    }

    #[test]
    fn test_play_session_finishes() {
        let cfg = GeneratorConfig::for_n(1);
        let mut rng = SmallRng::seed_from_u64(3);
        let seq = generate(&cfg, &mut rng).unwrap().into_sequence();
        let mut session = Session::default();
        let effects = session.start(seq);
        let tally = play_session(&mut session, effects, &SimulatedParticipant::PERFECT, &mut rng);
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.score(), Some(&tally));
    }

    #[test]
    fn test_batch_deterministic() {
        let cfg = GeneratorConfig::for_n(2);
        let p = SimulatedParticipant::new(0.8, 0.1, 0.3).unwrap();
        let a = simulate_batch(&cfg, &p, 16, 99).unwrap();
        let b = simulate_batch(&cfg, &p, 16, 99).unwrap();
        assert_eq!(a.games.len(), 16);
        assert_eq!(a.games, b.games);
    }

    #[test]
    fn test_batch_rejects_invalid_config() {
        let mut cfg = GeneratorConfig::for_n(2);
        cfg.alphabet = vec!['x'];
        assert!(simulate_batch(&cfg, &SimulatedParticipant::PERFECT, 4, 0).is_err());
    }
}
