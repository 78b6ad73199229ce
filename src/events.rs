//! In-process event buses for host, application and exchange notifications

use chrono::{DateTime, Utc};
use dah::{ObjectDescriptor, State, Status};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default capacity of each event channel
pub const EVENT_CAPACITY: usize = 256;

/// Fan-out channel for one event type.
///
/// Publishing never blocks and succeeds with no subscribers; slow
/// subscribers observe `RecvError::Lagged`.
#[derive(Debug)]
pub struct EventBus<E: Clone> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: E) {
        let _ = self.sender.send(event);
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

/// Side effect raised by a listed lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    AppReady,
    ResourcesReleased,
    WorkStarted,
    WorkResumed,
    WorkCompleted,
    WorkSuspended,
    WorkCanceled,
    SessionExited,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Raised for every `notifyStateChanged`, listed or not
    StateChanged(State),
    Lifecycle(LifecycleEvent),
    StatusReceived {
        status: Status,
        received_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationEvent {
    /// The host asked for a state change
    StateRequested { requested: State, accepted: bool },
    /// The local mirror of the session state changed
    StateChanged(State),
    BroughtToFront,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    DataAvailable {
        last_batch: bool,
        descriptors: Vec<ObjectDescriptor>,
    },
    DataReleased {
        ids: Vec<Uuid>,
    },
}
