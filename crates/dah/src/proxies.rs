//! Typed proxies for the remote Application, Host and Data Exchange interfaces

use serde_json::Value;
use uuid::Uuid;

use crate::client::TransportClient;
use crate::codec::{encode, encode_uuids};
use crate::config::PeerEndpoint;
use crate::interface::{application, exchange, host};
use crate::types::{AvailableData, ObjectLocator, Rectangle, State, Status};
use crate::Result;

/// Calls into a hosted application's control interface
#[derive(Debug, Clone)]
pub struct ApplicationProxy {
    client: TransportClient,
}

impl ApplicationProxy {
    pub fn new(client: TransportClient) -> Self {
        Self { client }
    }

    pub fn connect(endpoint: PeerEndpoint) -> Result<Self> {
        Ok(Self::new(TransportClient::new(endpoint)?))
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    pub async fn get_state(&self) -> Result<State> {
        self.client.invoke(application::GET_STATE, vec![]).await
    }

    pub async fn set_state(&self, state: State) -> Result<bool> {
        self.client
            .invoke(application::SET_STATE, vec![encode(&state)?])
            .await
    }

    pub async fn bring_to_front(&self, area: Rectangle) -> Result<bool> {
        self.client
            .invoke(application::BRING_TO_FRONT, vec![encode(&area)?])
            .await
    }
}

/// Calls into the host's control interface
#[derive(Debug, Clone)]
pub struct HostProxy {
    client: TransportClient,
}

impl HostProxy {
    pub fn new(client: TransportClient) -> Self {
        Self { client }
    }

    pub fn connect(endpoint: PeerEndpoint) -> Result<Self> {
        Ok(Self::new(TransportClient::new(endpoint)?))
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    pub async fn generate_uid(&self) -> Result<String> {
        self.client.invoke(host::GENERATE_UID, vec![]).await
    }

    pub async fn get_available_screen(&self, preferred: Rectangle) -> Result<Rectangle> {
        self.client
            .invoke(host::GET_AVAILABLE_SCREEN, vec![encode(&preferred)?])
            .await
    }

    pub async fn get_output_location(&self, preferred_protocols: &[String]) -> Result<String> {
        self.client
            .invoke(host::GET_OUTPUT_LOCATION, vec![encode(preferred_protocols)?])
            .await
    }

    pub async fn notify_state_changed(&self, state: State) -> Result<()> {
        self.client
            .invoke(host::NOTIFY_STATE_CHANGED, vec![encode(&state)?])
            .await
    }

    pub async fn notify_status(&self, status: &Status) -> Result<()> {
        self.client
            .invoke(host::NOTIFY_STATUS, vec![encode(status)?])
            .await
    }
}

/// Calls into a peer's data exchange interface
#[derive(Debug, Clone)]
pub struct ExchangeProxy {
    client: TransportClient,
}

impl ExchangeProxy {
    pub fn new(client: TransportClient) -> Self {
        Self { client }
    }

    pub fn connect(endpoint: PeerEndpoint) -> Result<Self> {
        Ok(Self::new(TransportClient::new(endpoint)?))
    }

    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    pub async fn notify_data_available(&self, data: &AvailableData, last_batch: bool) -> Result<bool> {
        self.client
            .invoke(
                exchange::NOTIFY_DATA_AVAILABLE,
                vec![encode(data)?, Value::Bool(last_batch)],
            )
            .await
    }

    pub async fn get_data(
        &self,
        object_ids: &[Uuid],
        acceptable_transfer_syntaxes: &[String],
        include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>> {
        self.client
            .invoke(
                exchange::GET_DATA,
                vec![
                    encode_uuids(object_ids)?,
                    encode(acceptable_transfer_syntaxes)?,
                    Value::Bool(include_bulk_data),
                ],
            )
            .await
    }

    pub async fn release_data(&self, object_ids: &[Uuid]) -> Result<()> {
        self.client
            .invoke(exchange::RELEASE_DATA, vec![encode_uuids(object_ids)?])
            .await
    }
}
