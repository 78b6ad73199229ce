use std::sync::Arc;

use async_trait::async_trait;
use dah::codec::{encode, MethodCall};
use dah::interface::application;
use dah::{DahError, Fault, GroupKind, HandlerGroup, Interface, Rectangle, Result, State};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ApplicationContext, ApplicationLogic};
use crate::events::ApplicationEvent;

/// Application control interface served to the host
pub struct ApplicationControlHandlers {
    ctx: Arc<ApplicationContext>,
    logic: Arc<dyn ApplicationLogic>,
}

impl ApplicationControlHandlers {
    pub(crate) fn new(ctx: Arc<ApplicationContext>, logic: Arc<dyn ApplicationLogic>) -> Self {
        Self { ctx, logic }
    }

    async fn set_state(&self, requested: State) -> bool {
        let current = self.ctx.state();
        let accepted = self.logic.on_state_requested(current, requested).await;
        debug!(
            "Host requested {} -> {}, accepted: {}",
            current, requested, accepted
        );
        self.ctx.events.publish(ApplicationEvent::StateRequested {
            requested,
            accepted,
        });

        if accepted {
            // The host hears about the new state before this call returns.
            if let Err(e) = self.ctx.report_state(requested).await {
                warn!("Failed to report state {} to host: {}", requested, e);
            }
        }
        accepted
    }
}

#[async_trait]
impl HandlerGroup for ApplicationControlHandlers {
    fn interface(&self) -> Interface {
        Interface::Application
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Control
    }

    async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        match call.method.as_str() {
            application::GET_STATE => encode(&self.ctx.state()),
            application::SET_STATE => {
                let state: State = call.param(0, "newState")?;
                Ok(Value::Bool(self.set_state(state).await))
            }
            application::BRING_TO_FRONT => {
                let area: Rectangle = call.param(0, "requestedScreenArea")?;
                let raised = self.logic.bring_to_front(area).await;
                if raised {
                    self.ctx.events.publish(ApplicationEvent::BroughtToFront);
                }
                Ok(Value::Bool(raised))
            }
            other => Err(DahError::Fault(Fault::unknown_method(other))),
        }
    }
}
