//! Statistics aggregation from simulated games.
//!
//! Summarizes generator quality (exact-hit rate, attempts used, realized
//! match and lure counts) and per-channel scores across a batch.

use serde::Serialize;

use crate::error::Result;
use crate::generator::targets;
use crate::scoring::ChannelScore;
use crate::types::{GeneratorConfig, MatchCounts};

use super::engine::GameSummary;
use super::participant::SimulatedParticipant;

// ── Top-level statistics ────────────────────────────────────────────

#[derive(Serialize)]
pub struct GameStatistics {
    pub num_games: u64,
    pub seed: u64,
    pub n: usize,
    pub total_trials: usize,
    pub participant: SimulatedParticipant,
    pub generator: GeneratorStatistics,
    pub visual: ChannelStatistics,
    pub audio: ChannelStatistics,
}

// ── Generator quality ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct GeneratorStatistics {
    pub targets: MatchCounts,
    /// Fraction of games where all three targets were hit.
    pub exact_rate: f64,
    pub mean_attempts: f64,
    pub median_attempts: usize,
    pub max_attempts: usize,
    pub mean_visual_matches: f64,
    pub mean_audio_matches: f64,
    pub mean_both_matches: f64,
    pub mean_visual_lures: f64,
    pub mean_audio_lures: f64,
}

// ── Per-channel scores ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct ChannelStatistics {
    pub mean_correct: f64,
    pub mean_missed: f64,
    pub mean_false_alarms: f64,
    pub mean_percent: f64,
    pub std_dev_percent: f64,
    pub min_percent: u32,
    pub max_percent: u32,
}

fn mean(values: impl Iterator<Item = f64>, n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        values.sum::<f64>() / n
    }
}

fn channel_statistics(
    games: &[GameSummary],
    pick: impl Fn(&GameSummary) -> ChannelScore,
) -> ChannelStatistics {
    let n = games.len() as f64;
    let scores: Vec<_> = games.iter().map(&pick).collect();
    let percents: Vec<u32> = scores.iter().map(|s| s.percent()).collect();

    let mean_percent = mean(percents.iter().map(|&p| p as f64), n);
    let variance = mean(
        percents.iter().map(|&p| (p as f64 - mean_percent).powi(2)),
        n,
    );

    ChannelStatistics {
        mean_correct: mean(scores.iter().map(|s| s.correct as f64), n),
        mean_missed: mean(scores.iter().map(|s| s.missed as f64), n),
        mean_false_alarms: mean(scores.iter().map(|s| s.false_alarms as f64), n),
        mean_percent,
        std_dev_percent: variance.sqrt(),
        min_percent: percents.iter().copied().min().unwrap_or(0),
        max_percent: percents.iter().copied().max().unwrap_or(0),
    }
}

pub fn aggregate_statistics(
    games: &[GameSummary],
    config: &GeneratorConfig,
    participant: &SimulatedParticipant,
    seed: u64,
) -> GameStatistics {
    let n = games.len() as f64;

    let mut attempts: Vec<usize> = games.iter().map(|g| g.attempts).collect();
    attempts.sort_unstable();

    let generator = GeneratorStatistics {
        targets: targets(config),
        exact_rate: mean(games.iter().map(|g| if g.exact { 1.0 } else { 0.0 }), n),
        mean_attempts: mean(attempts.iter().map(|&a| a as f64), n),
        median_attempts: attempts.get(attempts.len() / 2).copied().unwrap_or(0),
        max_attempts: attempts.last().copied().unwrap_or(0),
        mean_visual_matches: mean(games.iter().map(|g| g.realized.visual as f64), n),
        mean_audio_matches: mean(games.iter().map(|g| g.realized.audio as f64), n),
        mean_both_matches: mean(games.iter().map(|g| g.realized.both as f64), n),
        mean_visual_lures: mean(games.iter().map(|g| g.visual_lures as f64), n),
        mean_audio_lures: mean(games.iter().map(|g| g.audio_lures as f64), n),
    };

    GameStatistics {
        num_games: games.len() as u64,
        seed,
        n: config.n,
        total_trials: config.total_trials,
        participant: *participant,
        generator,
        visual: channel_statistics(games, |g| g.tally.visual),
        audio: channel_statistics(games, |g| g.tally.audio),
    }
}

/// Write `stats` as pretty-printed JSON, creating parent directories.
pub fn save_statistics(stats: &GameStatistics, path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(stats)?;
    std::fs::write(path, json)?;
    Ok(())
}
