//! Wall-clock driver: runs a [`Session`] on the tokio runtime.
//!
//! The session sits behind an async mutex, so response presses and timer
//! expiries are applied one at a time. `ArmTimer` effects become sleeping
//! tasks that call back with their token; arming a new timer aborts the
//! previous task, and the session's token check drops any expiry that still
//! slips through. `Present` and `Finished` go to a [`Presenter`] without
//! being awaited.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::lifecycle::{Effect, Session, SessionSnapshot, TimerToken};
use crate::scoring::ScoreTally;
use crate::types::{Channel, Sequence, Timing, Trial};

/// Receives presentation side effects. Called with the session lock held,
/// so implementations must not call back into the driver.
pub trait Presenter: Send + Sync + 'static {
    fn present(&self, index: usize, trial: &Trial);

    fn finished(&self, _tally: &ScoreTally) {}
}

/// Presenter that discards everything (the HTTP front polls snapshots).
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&self, _index: usize, _trial: &Trial) {}
}

/// Presentation event forwarded by [`ChannelPresenter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentEvent {
    Trial { index: usize, trial: Trial },
    Finished(ScoreTally),
}

/// Presenter that forwards events over an unbounded channel.
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<PresentEvent>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Presenter for ChannelPresenter {
    fn present(&self, index: usize, trial: &Trial) {
        // Receiver gone means nobody is watching; not an error.
        let _ = self.tx.send(PresentEvent::Trial {
            index,
            trial: *trial,
        });
    }

    fn finished(&self, tally: &ScoreTally) {
        let _ = self.tx.send(PresentEvent::Finished(*tally));
    }
}

struct Inner {
    session: Session,
    timer: Option<JoinHandle<()>>,
}

/// Cloneable handle to a session driven by real timers.
#[derive(Clone)]
pub struct SessionDriver {
    inner: Arc<Mutex<Inner>>,
    presenter: Arc<dyn Presenter>,
}

impl SessionDriver {
    pub fn new(timing: Timing, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                session: Session::new(timing),
                timer: None,
            })),
            presenter,
        }
    }

    /// Start a play-through, abandoning any current one.
    pub async fn start(&self, sequence: Sequence) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        let effects = inner.session.start(sequence);
        self.apply(&mut inner, effects);
        inner.session.snapshot()
    }

    /// Forward a press. Returns whether it registered.
    pub async fn record_response(&self, channel: Channel) -> bool {
        self.inner.lock().await.session.record_response(channel)
    }

    /// Forward a press and snapshot the session under the same lock, so the
    /// snapshot shows the window the press was judged against.
    pub async fn respond(&self, channel: Channel) -> (bool, SessionSnapshot) {
        let mut inner = self.inner.lock().await;
        let registered = inner.session.record_response(channel);
        (registered, inner.session.snapshot())
    }

    /// Cancel the pending timer and go back to idle.
    pub async fn restart(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.timer.take() {
            handle.abort();
        }
        inner.session.restart();
        inner.session.snapshot()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.session.snapshot()
    }

    /// Run `f` against the session under the lock, for read-only queries.
    pub async fn inspect<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.inner.lock().await.session)
    }

    fn apply(&self, inner: &mut Inner, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Present { index } => {
                    if let Some(trial) = inner.session.sequence().and_then(|s| s.get(index)) {
                        self.presenter.present(index, trial);
                    }
                }
                Effect::ArmTimer { token, after } => {
                    if let Some(previous) = inner.timer.take() {
                        previous.abort();
                    }
                    let driver = self.clone();
                    inner.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        driver.expire(token).await;
                    }));
                }
                Effect::Finished(tally) => {
                    self.presenter.finished(&tally);
                }
            }
        }
    }

    async fn expire(&self, token: TimerToken) {
        let mut inner = self.inner.lock().await;
        // This task is the one stored in `inner.timer`; drop the handle
        // without aborting ourselves.
        if inner.session.pending_timer() == Some(token) {
            inner.timer = None;
        }
        let effects = inner.session.on_timer_expire(token);
        self.apply(&mut inner, effects);
    }
}
