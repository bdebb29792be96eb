use anyhow::Context;
use clap::Parser;

use dual_nback::constants::{is_supported_n, DEFAULT_N, N_MAX, N_MIN};
use dual_nback::env_config;
use dual_nback::simulation::{
    aggregate_statistics, save_statistics, simulate_batch, SimulatedParticipant,
};
use dual_nback::types::GeneratorConfig;

#[derive(Parser)]
#[command(
    name = "nback-simulate",
    about = "Simulate dual N-back play-throughs and report generator and score statistics",
    version
)]
struct Args {
    /// Number of games to simulate
    #[arg(long, default_value_t = 1000)]
    games: usize,

    /// RNG seed; game i uses seed + i
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// N-back lag
    #[arg(long, default_value_t = DEFAULT_N)]
    n: usize,

    /// Probability of responding to a match
    #[arg(long, default_value_t = 0.8)]
    hit_rate: f64,

    /// Probability of responding to a plain non-match
    #[arg(long, default_value_t = 0.1)]
    false_alarm_rate: f64,

    /// Probability of responding to a lure
    #[arg(long, default_value_t = 0.25)]
    lure_false_alarm_rate: f64,

    /// Write statistics JSON to this file
    #[arg(long)]
    output: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_config::init_tracing();
    let args = Args::parse();

    if !is_supported_n(args.n) {
        anyhow::bail!("--n must be between {} and {}", N_MIN, N_MAX);
    }
    env_config::init_rayon_threads();

    let config = GeneratorConfig::for_n(args.n);
    let participant = SimulatedParticipant::new(
        args.hit_rate,
        args.false_alarm_rate,
        args.lure_false_alarm_rate,
    )?;

    let result = simulate_batch(&config, &participant, args.games, args.seed)?;
    let stats = aggregate_statistics(&result.games, &config, &participant, args.seed);

    println!(
        "Simulated {} games (N={}, {} trials) in {:.2?}",
        stats.num_games, stats.n, stats.total_trials, result.elapsed
    );
    println!(
        "Generator: exact {:.1}%, attempts mean {:.1} / median {} / max {}",
        stats.generator.exact_rate * 100.0,
        stats.generator.mean_attempts,
        stats.generator.median_attempts,
        stats.generator.max_attempts
    );
    println!(
        "Matches: visual {:.2}, audio {:.2}, both {:.2} (targets {}/{}/{})",
        stats.generator.mean_visual_matches,
        stats.generator.mean_audio_matches,
        stats.generator.mean_both_matches,
        stats.generator.targets.visual,
        stats.generator.targets.audio,
        stats.generator.targets.both
    );
    println!(
        "Lures: visual {:.2}, audio {:.2}",
        stats.generator.mean_visual_lures, stats.generator.mean_audio_lures
    );
    for (name, ch) in [("Visual", &stats.visual), ("Audio", &stats.audio)] {
        println!(
            "{:<6} score {:.1}% ± {:.1} (min {}, max {}), correct {:.2}, missed {:.2}, false alarms {:.2}",
            name,
            ch.mean_percent,
            ch.std_dev_percent,
            ch.min_percent,
            ch.max_percent,
            ch.mean_correct,
            ch.mean_missed,
            ch.mean_false_alarms
        );
    }

    if let Some(path) = args.output {
        save_statistics(&stats, &path)
            .with_context(|| format!("failed to write statistics to {path}"))?;
        println!("Wrote {}", path);
    }

    Ok(())
}
