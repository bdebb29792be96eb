//! # Dual N-back: stimulus generation and trial lifecycle
//!
//! A dual N-back play-through shows a sequence of trials, each pairing a grid
//! position with a spoken letter. On every trial the participant reports
//! whether the position and/or the letter repeats the one from exactly N
//! trials earlier.
//!
//! ## Components
//!
//! | Stage | Rust module | Description |
//! |-------|-------------|-------------|
//! | Generate | [`generator`] | Constrained random search for a sequence hitting visual / audio / both match targets, with near-miss lures |
//! | Play | [`lifecycle`] | Timer-driven state machine: idle → running ⇄ between trials → finished |
//! | Score | [`scoring`] | Per-channel correct / missed / false-alarm tally from sequence × responses |
//! | Drive | `driver` | Runs a session on tokio timers (feature `server`) |
//! | Serve | `server` | Axum endpoints for a browser frontend (feature `server`) |
//! | Simulate | [`simulation`] | Rayon batches of synthetic play-throughs with aggregate statistics |
//!
//! ## Invariants
//!
//! - A sequence has `total_trials = base + N` trials; the first N are seed
//!   trials with no marks.
//! - For i ≥ N, `visual_match(i) == (position[i] == position[i - N])` and
//!   `audio_match(i) == (letter[i] == letter[i - N])`, on every trial.
//! - A response registers at most once per (trial, channel), and only while
//!   that trial's window is open.
//! - A timer expiry only acts if its token is the one currently pending.

pub mod constants;
#[cfg(feature = "server")]
pub mod driver;
pub mod env_config;
pub mod error;
pub mod generator;
pub mod lifecycle;
pub mod scoring;
#[cfg(feature = "server")]
pub mod server;
pub mod simulation;
pub mod types;

pub use error::{NBackError, Result};
pub use generator::{generate, Generation};
pub use lifecycle::{Effect, Phase, Session, TimerToken};
pub use scoring::{ChannelScore, ResponseLog, ScoreTally};
pub use types::{Channel, GeneratorConfig, Mark, Position, Sequence, Timing, Trial};
