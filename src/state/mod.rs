//! Lifecycle state machine of one hosting session

use dah::{DahError, State};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::events::LifecycleEvent;

/// A recorded state change and the lifecycle event it raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub event: LifecycleEvent,
}

/// Lifecycle event for a listed transition, `None` when `from -> to` is not allowed
pub fn lifecycle_event(from: State, to: State) -> Option<LifecycleEvent> {
    use State::*;

    match (from, to) {
        (Exit | Idle | Canceled, Idle) => Some(LifecycleEvent::AppReady),
        (Completed, Idle) => Some(LifecycleEvent::ResourcesReleased),
        (Idle, InProgress) => Some(LifecycleEvent::WorkStarted),
        (Suspended, InProgress) => Some(LifecycleEvent::WorkResumed),
        (InProgress, Completed) => Some(LifecycleEvent::WorkCompleted),
        (_, Suspended) => Some(LifecycleEvent::WorkSuspended),
        (_, Canceled) => Some(LifecycleEvent::WorkCanceled),
        (_, Exit) => Some(LifecycleEvent::SessionExited),
        _ => None,
    }
}

/// Session state owned by the host.
///
/// The last known state lives in a watch channel so other tasks can read it
/// or wait for a particular value.
#[derive(Debug)]
pub struct StateMachine {
    state: watch::Sender<State>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// New session, starting in [`State::Exit`]
    pub fn new() -> Self {
        let (state, _) = watch::channel(State::Exit);
        Self { state }
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Apply a state change reported by the application.
    ///
    /// The new state is recorded even when the transition is not listed; in
    /// that case [`DahError::InvalidTransition`] is returned.
    pub fn notify_state_changed(&self, to: State) -> Result<Transition, DahError> {
        let from = self.state.send_replace(to);

        match lifecycle_event(from, to) {
            Some(event) => {
                info!("Session state {} -> {} ({:?})", from, to, event);
                Ok(Transition { from, to, event })
            }
            None => {
                warn!("Unlisted session state transition {} -> {}", from, to);
                Err(DahError::InvalidTransition { from, to })
            }
        }
    }
}
