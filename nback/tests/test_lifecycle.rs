//! Scripted play-throughs of the trial lifecycle.
//!
//! Timers are expired by hand with the tokens the session hands out, so
//! these tests are exact about ordering without touching a clock.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use dual_nback::generator::{generate, targets};
use dual_nback::lifecycle::{Effect, Phase, Session, TimerToken};
use dual_nback::scoring::{ChannelScore, ScoreTally};
use dual_nback::types::{Channel, GeneratorConfig, Mark, Position, Sequence, Timing, Trial};

fn small_config() -> GeneratorConfig {
    let mut cfg = GeneratorConfig::for_n(2);
    cfg.total_trials = 8;
    cfg.grid_size = 3;
    cfg.alphabet = vec!['a', 'b', 'c', 'd'];
    cfg
}

fn token_of(effects: &[Effect]) -> Option<TimerToken> {
    effects.iter().find_map(|e| match e {
        Effect::ArmTimer { token, .. } => Some(*token),
        _ => None,
    })
}

/// Play `sequence`, pressing `visual`/`audio` on the trials the closures pick.
fn play(
    sequence: Sequence,
    visual: impl Fn(usize) -> bool,
    audio: impl Fn(usize) -> bool,
) -> (Session, Vec<Effect>) {
    let mut session = Session::new(Timing::default());
    let mut log = Vec::new();
    let mut effects = session.start(sequence);
    loop {
        log.extend(effects.iter().cloned());
        for effect in &effects {
            if let Effect::Present { index } = effect {
                if visual(*index) {
                    session.record_response(Channel::Visual);
                }
                if audio(*index) {
                    session.record_response(Channel::Audio);
                }
            }
        }
        match token_of(&effects) {
            Some(token) => effects = session.on_timer_expire(token),
            None => break,
        }
    }
    (session, log)
}

// ── End-to-end scenario ─────────────────────────────────────────────

/// The sequence seed 2025 yields for `small_config()`.
fn seeded_trials() -> Vec<Trial> {
    let positions = [(2, 2), (2, 2), (0, 0), (1, 0), (0, 0), (1, 0), (0, 1), (2, 1)];
    let letters = ['d', 'c', 'c', 'b', 'a', 'c', 'a', 'c'];
    positions
        .iter()
        .zip(letters)
        .enumerate()
        .map(|(i, (&(row, col), letter))| Trial {
            position: Position::new(row, col),
            letter,
            visual: if i == 4 || i == 5 { Mark::Match } else { Mark::Plain },
            audio: match i {
                2 => Mark::Lure { lag: 1 },
                6 | 7 => Mark::Match,
                _ => Mark::Plain,
            },
        })
        .collect()
}

#[test]
fn seeded_small_game_is_fully_determined() {
    let cfg = small_config();
    let generation = generate(&cfg, &mut SmallRng::seed_from_u64(2025)).unwrap();

    // M = 6 scorable trials: round(1.8) = 2 per channel, floor(0.6) = 0 both
    assert!(generation.is_exact());
    let seq = generation.into_sequence();
    assert_eq!(seq.n(), 2);
    assert_eq!(seq.trials(), seeded_trials().as_slice());
    assert_eq!(seq.match_counts(), targets(&cfg));
    assert_eq!(seq.both_match_count(), 0);
}

#[test]
fn seeded_small_game_scores_scripted_responses() {
    let expected_trials = seeded_trials();
    let k = expected_trials.iter().filter(|t| t.visual_match()).count() as u32;
    let m = expected_trials.iter().filter(|t| t.audio_match()).count() as u32;
    assert_eq!((k, m), (2, 2));

    let seq = generate(&small_config(), &mut SmallRng::seed_from_u64(2025))
        .unwrap()
        .into_sequence();
    assert_eq!(seq.trials(), expected_trials.as_slice());

    // press visual on exactly the visual matches (trials 4 and 5), never audio
    let (session, effects) = play(seq, |i| i == 4 || i == 5, |_| false);

    assert_eq!(session.phase(), Phase::Finished);
    let expected = ScoreTally {
        visual: ChannelScore {
            correct: k,
            missed: 0,
            false_alarms: 0,
        },
        audio: ChannelScore {
            correct: 0,
            missed: m,
            false_alarms: 0,
        },
    };
    assert_eq!(session.score(), Some(&expected));
    assert_eq!(effects.last(), Some(&Effect::Finished(expected)));
    assert_eq!(expected.visual.percent(), 100);
    assert_eq!(expected.audio.percent(), 0);
}

// ── Timing and transitions ──────────────────────────────────────────

#[test]
fn every_trial_presented_once_in_order() {
    let seq = generate(&small_config(), &mut SmallRng::seed_from_u64(1))
        .unwrap()
        .into_sequence();
    let (_, effects) = play(seq, |_| false, |_| false);
    let presented: Vec<usize> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Present { index } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(presented, (0..8).collect::<Vec<_>>());
}

#[test]
fn timers_alternate_trial_and_pause() {
    let timing = Timing::default();
    let seq = generate(&small_config(), &mut SmallRng::seed_from_u64(1))
        .unwrap()
        .into_sequence();
    let (_, effects) = play(seq, |_| false, |_| false);
    let durations: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::ArmTimer { after, .. } => Some(*after),
            _ => None,
        })
        .collect();
    // 8 trial windows and 7 pauses; the last window ends the game directly
    assert_eq!(durations.len(), 15);
    for (i, d) in durations.iter().enumerate() {
        let expected = if i % 2 == 0 { timing.trial } else { timing.pause };
        assert_eq!(*d, expected, "timer {i}");
    }
}

#[test]
fn presses_during_pause_are_dropped() {
    let p = Position::new;
    let seq = Sequence::from_stimuli(1, &[(p(0, 0), 'a'), (p(0, 0), 'b'), (p(1, 1), 'b')]).unwrap();
    let mut session = Session::default();
    let effects = session.start(seq);

    // close trial 0, press during the pause
    let effects = session.on_timer_expire(token_of(&effects).unwrap());
    assert_eq!(session.phase(), Phase::BetweenTrials);
    assert!(!session.record_response(Channel::Visual));

    // trial 1 opens; the pause press did not carry over
    let _ = session.on_timer_expire(token_of(&effects).unwrap());
    assert_eq!(session.trial_index(), Some(1));
    assert!(!session.responses().get(Channel::Visual, 0));
    assert!(!session.responses().get(Channel::Visual, 1));
    assert!(session.record_response(Channel::Visual));
    assert!(!session.record_response(Channel::Visual));
}

#[test]
fn false_alarms_and_misses() {
    let p = Position::new;
    // n = 1: visual match on 1, audio match on 2
    let seq = Sequence::from_stimuli(1, &[(p(0, 0), 'a'), (p(0, 0), 'b'), (p(1, 1), 'b')]).unwrap();
    let (session, _) = play(seq, |i| i == 2, |i| i == 0 || i == 2);
    let tally = session.score().copied().unwrap();
    assert_eq!(
        tally.visual,
        ChannelScore {
            correct: 0,
            missed: 1,
            false_alarms: 1
        }
    );
    assert_eq!(
        tally.audio,
        ChannelScore {
            correct: 1,
            missed: 0,
            false_alarms: 1
        }
    );
    assert_eq!(tally.audio.percent(), 50);
}

// ── Restart race ────────────────────────────────────────────────────

#[test]
fn restart_mid_sequence_invalidates_timer_and_log() {
    let seq = generate(&small_config(), &mut SmallRng::seed_from_u64(5))
        .unwrap()
        .into_sequence();
    let mut session = Session::default();
    let mut effects = session.start(seq.clone());
    // R0 → B0 → R1 → B1 → R2
    for _ in 0..4 {
        effects = session.on_timer_expire(token_of(&effects).unwrap());
    }
    assert_eq!(session.phase(), Phase::Running);
    assert_eq!(session.trial_index(), Some(2));
    assert!(session.record_response(Channel::Audio));
    assert!(session.responses().get(Channel::Audio, 2));
    let stale = token_of(&effects).unwrap();

    session.restart();
    assert_eq!(session.phase(), Phase::Idle);
    assert!(!session.record_response(Channel::Audio));
    assert!(session.on_timer_expire(stale).is_empty());
    assert_eq!(session.phase(), Phase::Idle);

    // A fresh start gets a clean log; the stale timer still cannot fire.
    let mut effects = session.start(seq);
    assert!(session.on_timer_expire(stale).is_empty());
    assert_eq!(session.trial_index(), Some(0));
    for _ in 0..4 {
        effects = session.on_timer_expire(token_of(&effects).unwrap());
    }
    assert_eq!(session.phase(), Phase::Running);
    assert_eq!(session.trial_index(), Some(2));
    assert!(!session.responses().get(Channel::Audio, 2));
    assert!(!session.snapshot().audio_pressed);
    assert!(session.record_response(Channel::Audio));
}

#[test]
fn start_while_running_abandons_previous_game() {
    let cfg = small_config();
    let first = generate(&cfg, &mut SmallRng::seed_from_u64(10))
        .unwrap()
        .into_sequence();
    let second = generate(&cfg, &mut SmallRng::seed_from_u64(11))
        .unwrap()
        .into_sequence();

    let mut session = Session::default();
    let old = token_of(&session.start(first)).unwrap();
    session.record_response(Channel::Visual);
    let new = token_of(&session.start(second.clone())).unwrap();

    assert_ne!(old, new);
    assert!(session.on_timer_expire(old).is_empty());
    assert!(!session.responses().get(Channel::Visual, 0));
    assert_eq!(session.sequence(), Some(&second));
}
