use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dah::codec::{encode, MethodCall};
use dah::interface::host;
use dah::{
    DahError, Fault, FaultCode, GroupKind, HandlerGroup, Interface, Rectangle, Result, Severity,
    State, Status,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::HostContext;
use crate::events::HostEvent;
use crate::uid::generate_uid;

/// Host control interface served to the hosted application
pub struct HostControlHandlers {
    ctx: Arc<HostContext>,
    // Held while a state change is recorded and its events are published.
    transition: Mutex<()>,
}

impl HostControlHandlers {
    pub(crate) fn new(ctx: Arc<HostContext>) -> Self {
        Self {
            ctx,
            transition: Mutex::new(()),
        }
    }

    fn available_screen(&self, preferred: Rectangle) -> Rectangle {
        let screen = self.ctx.screen;
        if preferred.is_empty() {
            return screen;
        }
        preferred.intersection(&screen).unwrap_or(screen)
    }

    fn output_location(&self, preferred_protocols: &[String]) -> Result<String> {
        let accepts_file = preferred_protocols.is_empty()
            || preferred_protocols
                .iter()
                .any(|p| p.eq_ignore_ascii_case("file"));
        if !accepts_file {
            return Err(DahError::Fault(Fault::new(
                FaultCode::Rejected,
                format!("no output location for protocols {:?}", preferred_protocols),
            )));
        }

        let url = self
            .ctx
            .storage
            .directory_url(&self.ctx.output_dir)
            .map_err(|e| DahError::internal(format!("output location unavailable: {}", e)))?;
        Ok(url.to_string())
    }

    async fn state_changed(&self, state: State) -> Result<()> {
        let _guard = self.transition.lock().await;
        let transition = self.ctx.state.notify_state_changed(state);
        self.ctx.events.publish(HostEvent::StateChanged(state));

        if state == State::Exit {
            self.ctx.exchange.clear_incoming().await;
        }

        let transition = transition?;
        self.ctx.events.publish(HostEvent::Lifecycle(transition.event));
        Ok(())
    }

    fn status(&self, status: Status) {
        match status.severity {
            Severity::Information => info!(
                "Application status {} ({}): {}",
                status.code_value, status.coding_scheme_designator, status.code_meaning
            ),
            Severity::Warning => warn!(
                "Application status {} ({}): {}",
                status.code_value, status.coding_scheme_designator, status.code_meaning
            ),
            Severity::Error | Severity::FatalError => error!(
                "Application status {:?} {} ({}): {}",
                status.severity, status.code_value, status.coding_scheme_designator, status.code_meaning
            ),
        }
        self.ctx.events.publish(HostEvent::StatusReceived {
            status,
            received_at: Utc::now(),
        });
    }
}

#[async_trait]
impl HandlerGroup for HostControlHandlers {
    fn interface(&self) -> Interface {
        Interface::Host
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Control
    }

    async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        match call.method.as_str() {
            host::GENERATE_UID => {
                let uid = generate_uid();
                debug!("Generated UID {}", uid);
                Ok(Value::String(uid))
            }
            host::GET_AVAILABLE_SCREEN => {
                let preferred: Rectangle = call.param(0, "preferredScreenArea")?;
                encode(&self.available_screen(preferred))
            }
            host::GET_OUTPUT_LOCATION => {
                let protocols: Vec<String> = call.param(0, "preferredProtocols")?;
                self.output_location(&protocols).map(Value::String)
            }
            host::NOTIFY_STATE_CHANGED => {
                let state: State = call.param(0, "newState")?;
                self.state_changed(state).await?;
                Ok(Value::Null)
            }
            host::NOTIFY_STATUS => {
                let status: Status = call.param(0, "status")?;
                self.status(status);
                Ok(Value::Null)
            }
            other => Err(DahError::Fault(Fault::unknown_method(other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, LifecycleEvent};
    use crate::exchange::ExchangeService;
    use crate::state::{lifecycle_event, StateMachine};
    use crate::storage::FilesystemStorage;
    use dah::codec::decode;
    use serde_json::json;
    use tempfile::TempDir;

    fn handlers(dir: &TempDir) -> HostControlHandlers {
        let storage = FilesystemStorage::new(dir.path()).unwrap();
        HostControlHandlers::new(Arc::new(HostContext {
            state: StateMachine::new(),
            exchange: Arc::new(ExchangeService::new()),
            events: EventBus::default(),
            storage: Arc::new(storage),
            screen: Rectangle::new(0, 0, 1920, 1080),
            output_dir: "session".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_available_screen_is_clipped() {
        let dir = TempDir::new().unwrap();
        let handlers = handlers(&dir);

        let call = MethodCall::new(
            host::GET_AVAILABLE_SCREEN,
            vec![encode(&Rectangle::new(1800, 1000, 400, 400)).unwrap()],
        );
        let area: Rectangle = decode(handlers.invoke(&call).await.unwrap()).unwrap();
        assert_eq!(area, Rectangle::new(1800, 1000, 120, 80));

        let call = MethodCall::new(
            host::GET_AVAILABLE_SCREEN,
            vec![encode(&Rectangle::new(5000, 5000, 10, 10)).unwrap()],
        );
        let area: Rectangle = decode(handlers.invoke(&call).await.unwrap()).unwrap();
        assert_eq!(area, Rectangle::new(0, 0, 1920, 1080));

        let call = MethodCall::new(
            host::GET_AVAILABLE_SCREEN,
            vec![encode(&Rectangle::new(i32::MAX - 10, 0, 100, 100)).unwrap()],
        );
        let area: Rectangle = decode(handlers.invoke(&call).await.unwrap()).unwrap();
        assert_eq!(area, Rectangle::new(0, 0, 1920, 1080));
    }

    #[tokio::test]
    async fn test_output_location_protocols() {
        let dir = TempDir::new().unwrap();
        let handlers = handlers(&dir);

        let call = MethodCall::new(host::GET_OUTPUT_LOCATION, vec![json!(["ftp", "FILE"])]);
        let location = handlers.invoke(&call).await.unwrap();
        let location = location.as_str().unwrap();
        assert!(location.starts_with("file://"));
        assert!(location.ends_with("/session/"));

        let call = MethodCall::new(host::GET_OUTPUT_LOCATION, vec![json!(["ftp"])]);
        match handlers.invoke(&call).await.unwrap_err() {
            DahError::Fault(fault) => assert_eq!(fault.code, FaultCode::Rejected),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_state_changes_raise_events() {
        let dir = TempDir::new().unwrap();
        let handlers = handlers(&dir);
        let mut events = handlers.ctx.events.subscribe();

        let call = MethodCall::new(host::NOTIFY_STATE_CHANGED, vec![json!("IDLE")]);
        assert_eq!(handlers.invoke(&call).await.unwrap(), Value::Null);
        assert_eq!(events.try_recv().unwrap(), HostEvent::StateChanged(State::Idle));
        assert_eq!(
            events.try_recv().unwrap(),
            HostEvent::Lifecycle(LifecycleEvent::AppReady)
        );

        let call = MethodCall::new(host::NOTIFY_STATE_CHANGED, vec![json!("COMPLETED")]);
        let err = handlers.invoke(&call).await.unwrap_err();
        assert!(matches!(err, DahError::InvalidTransition { .. }));
        assert_eq!(
            events.try_recv().unwrap(),
            HostEvent::StateChanged(State::Completed)
        );
        assert_eq!(handlers.ctx.state.state(), State::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_state_changes_publish_in_recorded_order() {
        let dir = TempDir::new().unwrap();
        let handlers = Arc::new(handlers(&dir));
        let mut events = handlers.ctx.events.subscribe();

        let states = [
            State::Idle,
            State::InProgress,
            State::Suspended,
            State::Completed,
            State::Canceled,
        ];
        let mut tasks = Vec::new();
        for _ in 0..20 {
            for state in states {
                let handlers = handlers.clone();
                tasks.push(tokio::spawn(async move {
                    let call =
                        MethodCall::new(host::NOTIFY_STATE_CHANGED, vec![encode(&state).unwrap()]);
                    let _ = handlers.invoke(&call).await;
                }));
            }
        }
        for task in tasks {
            task.await.unwrap();
        }

        // Replaying the StateChanged events must reproduce every lifecycle event
        // and end on the recorded state.
        let mut previous = State::Exit;
        let mut current = State::Exit;
        while let Ok(event) = events.try_recv() {
            match event {
                HostEvent::StateChanged(state) => {
                    previous = current;
                    current = state;
                }
                HostEvent::Lifecycle(event) => {
                    assert_eq!(lifecycle_event(previous, current), Some(event));
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(current, handlers.ctx.state.state());
    }

    #[tokio::test]
    async fn test_status_event() {
        let dir = TempDir::new().unwrap();
        let handlers = handlers(&dir);
        let mut events = handlers.ctx.events.subscribe();

        let status = Status {
            severity: Severity::Warning,
            coding_scheme_designator: "DCM".to_string(),
            code_value: "110503".to_string(),
            code_meaning: "Low disk space".to_string(),
        };
        let call = MethodCall::new(host::NOTIFY_STATUS, vec![encode(&status).unwrap()]);
        handlers.invoke(&call).await.unwrap();

        match events.try_recv().unwrap() {
            HostEvent::StatusReceived { status: received, .. } => assert_eq!(received, status),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_uid() {
        let dir = TempDir::new().unwrap();
        let handlers = handlers(&dir);
        let uid = handlers
            .invoke(&MethodCall::new(host::GENERATE_UID, vec![]))
            .await
            .unwrap();
        assert!(uid.as_str().unwrap().starts_with("2.25."));
    }
}
