//! Synthetic participant for simulated play-throughs.
//!
//! Responds on a channel with probability `hit_rate` when the trial is a
//! match, `lure_false_alarm_rate` when it is a lure, and `false_alarm_rate`
//! otherwise. Lures exist to draw out false alarms, so a realistic profile
//! has `lure_false_alarm_rate > false_alarm_rate`.

use rand::Rng;
use serde::Serialize;

use crate::error::{NBackError, Result};
use crate::types::Mark;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimulatedParticipant {
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub lure_false_alarm_rate: f64,
}

impl SimulatedParticipant {
    /// Responds to every match and nothing else.
    pub const PERFECT: Self = Self {
        hit_rate: 1.0,
        false_alarm_rate: 0.0,
        lure_false_alarm_rate: 0.0,
    };

    /// Never responds.
    pub const SILENT: Self = Self {
        hit_rate: 0.0,
        false_alarm_rate: 0.0,
        lure_false_alarm_rate: 0.0,
    };

    pub fn new(hit_rate: f64, false_alarm_rate: f64, lure_false_alarm_rate: f64) -> Result<Self> {
        let rates = [
            ("hit_rate", hit_rate),
            ("false_alarm_rate", false_alarm_rate),
            ("lure_false_alarm_rate", lure_false_alarm_rate),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(NBackError::invalid_configuration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        Ok(Self {
            hit_rate,
            false_alarm_rate,
            lure_false_alarm_rate,
        })
    }

    /// Whether this participant presses for a channel marked `mark`.
    pub fn responds<R: Rng>(&self, mark: Mark, rng: &mut R) -> bool {
        let p = match mark {
            Mark::Match => self.hit_rate,
            Mark::Lure { .. } => self.lure_false_alarm_rate,
            Mark::Plain => self.false_alarm_rate,
        };
        rng.random_bool(p)
    }
}
