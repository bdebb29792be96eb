//! Response capture and per-channel scoring.
//!
//! For every trial and channel:
//!
//! | responded | match | counted as |
//! |-----------|-------|------------|
//! | yes | yes | correct |
//! | yes | no  | false alarm |
//! | no  | yes | missed |
//! | no  | no  | not counted |
//!
//! The percentage score is `correct / (correct + missed + false alarms)`,
//! 0 when nothing was counted.

use serde::Serialize;

use crate::types::{Channel, Sequence};

/// Which channels the participant flagged, per trial.
///
/// Sized once when a play-through starts; a slot only ever goes from
/// `false` to `true`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseLog {
    visual: Box<[bool]>,
    audio: Box<[bool]>,
}

impl ResponseLog {
    pub fn new(len: usize) -> Self {
        Self {
            visual: vec![false; len].into_boxed_slice(),
            audio: vec![false; len].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.visual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visual.is_empty()
    }

    fn slots(&self, channel: Channel) -> &[bool] {
        match channel {
            Channel::Visual => &self.visual,
            Channel::Audio => &self.audio,
        }
    }

    /// Mark `channel` as flagged on trial `index`. Returns `true` only for
    /// the first registration; repeats and out-of-range indices return
    /// `false` and change nothing.
    pub fn record(&mut self, channel: Channel, index: usize) -> bool {
        let slots = match channel {
            Channel::Visual => &mut self.visual,
            Channel::Audio => &mut self.audio,
        };
        match slots.get_mut(index) {
            Some(slot) if !*slot => {
                *slot = true;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, channel: Channel, index: usize) -> bool {
        self.slots(channel).get(index).copied().unwrap_or(false)
    }
}

/// Correct / missed / false-alarm counts for one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelScore {
    pub correct: u32,
    pub missed: u32,
    pub false_alarms: u32,
}

impl ChannelScore {
    /// Denominator of the percentage score; true negatives are excluded.
    pub fn total(&self) -> u32 {
        self.correct + self.missed + self.false_alarms
    }

    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.correct as f64 / total as f64,
        }
    }

    /// Whole-number percentage, as shown on a result screen.
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }
}

/// Final scores for both channels of one play-through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTally {
    pub visual: ChannelScore,
    pub audio: ChannelScore,
}

impl ScoreTally {
    /// Score `responses` against `sequence`. Pure: the same inputs always
    /// give the same tally.
    pub fn compute(sequence: &Sequence, responses: &ResponseLog) -> Self {
        Self {
            visual: score_channel(sequence, responses, Channel::Visual),
            audio: score_channel(sequence, responses, Channel::Audio),
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelScore {
        match channel {
            Channel::Visual => &self.visual,
            Channel::Audio => &self.audio,
        }
    }
}

fn score_channel(sequence: &Sequence, responses: &ResponseLog, channel: Channel) -> ChannelScore {
    let mut score = ChannelScore::default();
    for (i, trial) in sequence.trials().iter().enumerate() {
        match (responses.get(channel, i), trial.is_match(channel)) {
            (true, true) => score.correct += 1,
            (true, false) => score.false_alarms += 1,
            (false, true) => score.missed += 1,
            (false, false) => {}
        }
    }
    score
}
