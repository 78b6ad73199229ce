//! Message router dispatching inbound calls to handler groups

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn, Instrument};

use crate::codec::{Fault, MethodCall, Reply};
use crate::interface::Interface;
use crate::{DahError, Result};

/// Role a handler group plays in the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Lifecycle control of the local side; at most one per router
    Control,
    /// Data exchange
    Exchange,
}

/// Dispatch table for one logical interface
#[async_trait]
pub trait HandlerGroup: Send + Sync {
    /// Interface implemented by this group
    fn interface(&self) -> Interface;

    fn kind(&self) -> GroupKind;

    /// Whether this group implements `method`
    fn handles(&self, method: &str) -> bool {
        self.interface().methods().contains(&method)
    }

    /// Execute the call and produce its result value
    async fn invoke(&self, call: &MethodCall) -> Result<Value>;
}

/// Outcome of routing one call
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Handled(Reply),
    Unhandled,
}

impl Dispatch {
    pub fn handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }

    /// Reply to send back, with a fault standing in for an unhandled call
    pub fn into_reply(self, method: &str) -> Reply {
        match self {
            Dispatch::Handled(reply) => reply,
            Dispatch::Unhandled => Reply::Fault(Fault::unknown_method(method)),
        }
    }
}

/// Ordered, runtime-mutable list of handler groups
#[derive(Default)]
pub struct MessageRouter {
    groups: RwLock<Vec<Arc<dyn HandlerGroup>>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler group after the existing ones.
    ///
    /// Only one [`GroupKind::Control`] group may be registered at a time.
    pub async fn register(&self, group: Arc<dyn HandlerGroup>) -> Result<()> {
        let mut groups = self.groups.write().await;
        if group.kind() == GroupKind::Control {
            if let Some(active) = groups.iter().find(|g| g.kind() == GroupKind::Control) {
                warn!(
                    "Refusing to register {} control group: {} control group already active",
                    group.interface(),
                    active.interface()
                );
                return Err(DahError::DuplicateRegistration(format!(
                    "{} control group already registered",
                    active.interface()
                )));
            }
        }
        debug!("Registered {} handler group", group.interface());
        groups.push(group);
        Ok(())
    }

    /// Remove every group serving `interface`; returns whether one was removed
    pub async fn unregister(&self, interface: Interface) -> bool {
        let mut groups = self.groups.write().await;
        let before = groups.len();
        groups.retain(|g| g.interface() != interface);
        let removed = groups.len() != before;
        if removed {
            debug!("Unregistered {} handler group", interface);
        }
        removed
    }

    /// Interfaces of the registered groups, in registration order
    pub async fn interfaces(&self) -> Vec<Interface> {
        self.groups
            .read()
            .await
            .iter()
            .map(|g| g.interface())
            .collect()
    }

    /// Route a call to the first group that recognises its method name
    pub async fn process(&self, call: &MethodCall) -> Dispatch {
        // Release the lock before invoking so handlers may re-enter the router.
        let group = {
            let groups = self.groups.read().await;
            groups.iter().find(|g| g.handles(&call.method)).cloned()
        };

        let Some(group) = group else {
            warn!("No handler group for method '{}'", call.method);
            return Dispatch::Unhandled;
        };

        let span = tracing::debug_span!("dispatch", method = %call.method, interface = %group.interface());
        let reply = match group.invoke(call).instrument(span).await {
            Ok(value) => Reply::Result(value),
            Err(err) => {
                warn!("{} failed: {}", call.method, err);
                Reply::Fault(Fault::from(&err))
            }
        };
        Dispatch::Handled(reply)
    }
}
