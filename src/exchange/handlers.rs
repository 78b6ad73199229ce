use std::sync::Arc;

use async_trait::async_trait;
use dah::codec::{encode, MethodCall};
use dah::interface::exchange;
use dah::{AvailableData, DahError, GroupKind, HandlerGroup, Interface, Result};
use serde_json::Value;

use super::ExchangeService;

/// Data Exchange handler group, identical on both sides
pub struct ExchangeHandlers {
    service: Arc<ExchangeService>,
}

impl ExchangeHandlers {
    pub fn new(service: Arc<ExchangeService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl HandlerGroup for ExchangeHandlers {
    fn interface(&self) -> Interface {
        Interface::DataExchange
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Exchange
    }

    async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        match call.method.as_str() {
            exchange::NOTIFY_DATA_AVAILABLE => {
                let data: AvailableData = call.param(0, "availableData")?;
                let last_batch: bool = call.param(1, "lastData")?;
                let accepted = self.service.on_data_available(data, last_batch).await;
                Ok(Value::Bool(accepted))
            }
            exchange::GET_DATA => {
                let ids = call.uuids_param(0, "objectUUIDs")?;
                let syntaxes: Vec<String> = call.param(1, "acceptableTransferSyntaxUIDs")?;
                let include_bulk_data: bool = call.param(2, "includeBulkData")?;
                let locators = self
                    .service
                    .get_data(&ids, &syntaxes, include_bulk_data)
                    .await;
                encode(&locators)
            }
            exchange::RELEASE_DATA => {
                let ids = call.uuids_param(0, "objectUUIDs")?;
                self.service.release_data(&ids).await;
                Ok(Value::Null)
            }
            other => Err(DahError::Fault(dah::Fault::unknown_method(other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dah::codec::{decode, encode_uuids};
    use dah::{ObjectLocator, Reply};
    use dah::{Dispatch, MessageRouter};
    use serde_json::json;
    use uuid::Uuid;

    async fn router() -> (Arc<ExchangeService>, MessageRouter) {
        let service = Arc::new(ExchangeService::new());
        let router = MessageRouter::new();
        router
            .register(Arc::new(ExchangeHandlers::new(Arc::clone(&service))))
            .await
            .unwrap();
        (service, router)
    }

    #[tokio::test]
    async fn test_get_data_over_router() {
        let (service, router) = router().await;
        let id = Uuid::new_v4();
        service
            .insert_locator(id, ObjectLocator::whole(id, id, "1.2.840.10008.1.2.1", "file:///d"))
            .await;

        let call = MethodCall::new(
            exchange::GET_DATA,
            vec![
                encode_uuids(&[id, Uuid::new_v4()]).unwrap(),
                json!(["1.2.840.10008.1.2.1"]),
                json!(false),
            ],
        );
        let Dispatch::Handled(Reply::Result(value)) = router.process(&call).await else {
            panic!("getData was not answered with a result");
        };
        let locators: Vec<ObjectLocator> = decode(value).unwrap();
        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].locator_id, id);
    }

    #[tokio::test]
    async fn test_bad_arguments_are_faults() {
        let (_service, router) = router().await;
        let call = MethodCall::new(exchange::NOTIFY_DATA_AVAILABLE, vec![json!({}), json!("yes")]);
        let dispatch = router.process(&call).await;
        assert!(matches!(dispatch, Dispatch::Handled(Reply::Fault(_))));
    }
}
