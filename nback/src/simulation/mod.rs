//! Batch play-through simulation and statistics.
//!
//! - [`participant`]: Synthetic responder with hit / false-alarm rates
//! - [`engine`]: Generate a sequence and play it through a [`crate::lifecycle::Session`]
//! - [`statistics`]: Aggregate generator quality and scores over many games

pub mod engine;
pub mod participant;
pub mod statistics;

// Re-export commonly used items
pub use engine::{play_session, simulate_batch, simulate_game, GameSummary, SimulationResult};
pub use participant::SimulatedParticipant;
pub use statistics::{aggregate_statistics, save_statistics, GameStatistics};
