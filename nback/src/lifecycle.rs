//! Trial lifecycle: timed advancement, response capture and final scoring.
//!
//! ```text
//! idle ─start─▶ running(0) ─timer─▶ between(0) ─timer─▶ running(1) ─ … ─▶ running(last) ─timer─▶ finished
//!   ▲                                                                                               │
//!   └──────────────────────────────── restart (from any state) ─────────────────────────────────────┘
//! ```
//!
//! [`Session`] never sleeps and performs no I/O. Each command returns the
//! [`Effect`]s the caller must carry out: show a trial, arm a timer, report
//! the final score. Every armed timer is identified by a fresh
//! [`TimerToken`]; only the single pending token is honoured, so an expiry
//! that arrives after `restart()` or a new `start()` is ignored.
//!
//! Responses are accepted only while a trial's window is open. Presses
//! during the pause, while idle or after the end are dropped without error.

use std::time::Duration;

use serde::Serialize;

use crate::scoring::{ResponseLog, ScoreTally};
use crate::types::{Channel, Letter, Position, Sequence, Timing, Trial};

/// Identifies one armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TimerToken(u64);

/// Side effect requested by a state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Show trial `index` (position and spoken letter).
    Present { index: usize },
    /// Call [`Session::on_timer_expire`] with `token` once `after` elapses.
    ArmTimer { token: TimerToken, after: Duration },
    /// The play-through ended with this score.
    Finished(ScoreTally),
}

/// Coarse state, for observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    BetweenTrials,
    Finished,
}

#[derive(Clone, Debug)]
enum State {
    Idle,
    /// Trial `index` is shown and its response window is open.
    Running { index: usize },
    /// Trial `index` has closed; the next one has not appeared yet.
    BetweenTrials { index: usize },
    Finished { tally: ScoreTally },
}

/// One play-through over a fixed sequence.
#[derive(Clone, Debug)]
pub struct Session {
    timing: Timing,
    state: State,
    sequence: Option<Sequence>,
    responses: ResponseLog,
    pending: Option<TimerToken>,
    next_token: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

impl Session {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            state: State::Idle,
            sequence: None,
            responses: ResponseLog::default(),
            pending: None,
            next_token: 0,
        }
    }

    /// Begin a play-through. Accepted in any state; whatever was running
    /// before is abandoned and its timers become stale.
    pub fn start(&mut self, sequence: Sequence) -> Vec<Effect> {
        tracing::info!(n = sequence.n(), trials = sequence.len(), "session started");
        self.responses = ResponseLog::new(sequence.len());
        self.sequence = Some(sequence);
        self.state = State::Running { index: 0 };
        let token = self.arm();
        vec![
            Effect::Present { index: 0 },
            Effect::ArmTimer {
                token,
                after: self.timing.trial,
            },
        ]
    }

    /// Flag a match on `channel` for the trial whose window is open.
    ///
    /// Returns whether the press registered. Repeated presses on the same
    /// trial and presses outside a window return `false`.
    pub fn record_response(&mut self, channel: Channel) -> bool {
        match self.state {
            State::Running { index } => self.responses.record(channel, index),
            _ => false,
        }
    }

    /// Handle expiry of the timer identified by `token`.
    pub fn on_timer_expire(&mut self, token: TimerToken) -> Vec<Effect> {
        if self.pending != Some(token) {
            tracing::debug!(?token, pending = ?self.pending, "ignoring stale timer");
            return Vec::new();
        }
        self.pending = None;

        match self.state {
            State::Running { index } => {
                if index + 1 >= self.total_trials() {
                    self.finish()
                } else {
                    self.state = State::BetweenTrials { index };
                    let token = self.arm();
                    vec![Effect::ArmTimer {
                        token,
                        after: self.timing.pause,
                    }]
                }
            }
            State::BetweenTrials { index } => {
                let next = index + 1;
                self.state = State::Running { index: next };
                let token = self.arm();
                vec![
                    Effect::Present { index: next },
                    Effect::ArmTimer {
                        token,
                        after: self.timing.trial,
                    },
                ]
            }
            State::Idle | State::Finished { .. } => Vec::new(),
        }
    }

    /// Fire the pending timer immediately, if any. Lets synchronous callers
    /// step through a play-through without waiting on a clock.
    pub fn expire_pending(&mut self) -> Vec<Effect> {
        match self.pending {
            Some(token) => self.on_timer_expire(token),
            None => Vec::new(),
        }
    }

    /// Hard interrupt back to idle: drops the sequence, responses and any
    /// pending timer.
    pub fn restart(&mut self) {
        if !matches!(self.state, State::Idle) {
            tracing::info!("session restarted");
        }
        self.state = State::Idle;
        self.sequence = None;
        self.responses = ResponseLog::default();
        self.pending = None;
    }

    fn arm(&mut self) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.pending = Some(token);
        token
    }

    fn finish(&mut self) -> Vec<Effect> {
        let tally = match &self.sequence {
            Some(sequence) => ScoreTally::compute(sequence, &self.responses),
            None => ScoreTally::default(),
        };
        tracing::info!(
            visual_correct = tally.visual.correct,
            visual_missed = tally.visual.missed,
            visual_false_alarms = tally.visual.false_alarms,
            audio_correct = tally.audio.correct,
            audio_missed = tally.audio.missed,
            audio_false_alarms = tally.audio.false_alarms,
            "session finished"
        );
        self.state = State::Finished { tally };
        vec![Effect::Finished(tally)]
    }

    // ── Observers ───────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Running { .. } => Phase::Running,
            State::BetweenTrials { .. } => Phase::BetweenTrials,
            State::Finished { .. } => Phase::Finished,
        }
    }

    /// Index of the trial being shown, or that just closed during a pause.
    pub fn trial_index(&self) -> Option<usize> {
        match self.state {
            State::Running { index } | State::BetweenTrials { index } => Some(index),
            _ => None,
        }
    }

    /// Trial currently on screen; `None` outside an open window.
    pub fn current_trial(&self) -> Option<&Trial> {
        match self.state {
            State::Running { index } => self.sequence.as_ref()?.get(index),
            _ => None,
        }
    }

    pub fn is_window_open(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Final score, once finished.
    pub fn score(&self) -> Option<&ScoreTally> {
        match &self.state {
            State::Finished { tally } => Some(tally),
            _ => None,
        }
    }

    pub fn responses(&self) -> &ResponseLog {
        &self.responses
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn total_trials(&self) -> usize {
        self.sequence.as_ref().map_or(0, Sequence::len)
    }

    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.pending
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Serializable view for a presentation layer. Exposes only the
    /// stimulus of the current trial, never its match marks.
    pub fn snapshot(&self) -> SessionSnapshot {
        let index = self.trial_index();
        let pressed = |channel| index.is_some_and(|i| self.responses.get(channel, i));
        SessionSnapshot {
            phase: self.phase(),
            n: self.sequence.as_ref().map(Sequence::n),
            trial_index: index,
            total_trials: self.total_trials(),
            stimulus: self.current_trial().map(|t| Stimulus {
                position: t.position,
                letter: t.letter,
            }),
            window_open: self.is_window_open(),
            visual_pressed: pressed(Channel::Visual),
            audio_pressed: pressed(Channel::Audio),
            score: self.score().map(ScoreReport::from),
        }
    }
}

/// What is on screen for the current trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Stimulus {
    pub position: Position,
    pub letter: Letter,
}

/// One channel's result line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub correct: u32,
    pub missed: u32,
    pub false_alarms: u32,
    pub percent: u32,
}

/// Final scores with percentages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub visual: ChannelReport,
    pub audio: ChannelReport,
}

impl From<&ScoreTally> for ScoreReport {
    fn from(tally: &ScoreTally) -> Self {
        let line = |channel| {
            let s = tally.channel(channel);
            ChannelReport {
                correct: s.correct,
                missed: s.missed,
                false_alarms: s.false_alarms,
                percent: s.percent(),
            }
        };
        Self {
            visual: line(Channel::Visual),
            audio: line(Channel::Audio),
        }
    }
}

/// Observer view of a [`Session`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub n: Option<usize>,
    pub trial_index: Option<usize>,
    pub total_trials: usize,
    pub stimulus: Option<Stimulus>,
    pub window_open: bool,
    pub visual_pressed: bool,
    pub audio_pressed: bool,
    pub score: Option<ScoreReport>,
}
