//! Shared environment configuration for the dual N-back binaries.
//!
//! Consolidates `NBACK_PORT`, `NBACK_TRIAL_MS`, `NBACK_PAUSE_MS`,
//! `RAYON_NUM_THREADS` and the tracing subscriber setup.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::types::Timing;

/// Install the fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// Read `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`, default 8).
/// Builds the rayon global thread pool, tolerating one that already exists.
/// Returns the thread count.
pub fn init_rayon_threads() -> usize {
    let num_threads = std::env::var("RAYON_NUM_THREADS")
        .or_else(|_| std::env::var("OMP_NUM_THREADS"))
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);
    if rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .is_err()
    {
        tracing::debug!("rayon global pool already initialized");
    }
    tracing::info!(num_threads, "rayon threads");
    num_threads
}

/// Read `NBACK_PORT` (default 9000).
pub fn server_port() -> u16 {
    std::env::var("NBACK_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9000)
}

/// Read `NBACK_TRIAL_MS` / `NBACK_PAUSE_MS`, falling back to the defaults.
pub fn timing() -> Timing {
    let default = Timing::default();
    let millis = |key: &str| {
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
    };
    Timing {
        trial: millis("NBACK_TRIAL_MS").unwrap_or(default.trial),
        pause: millis("NBACK_PAUSE_MS").unwrap_or(default.pause),
    }
}
