//! Hosted Application role

mod handlers;

pub use handlers::ApplicationControlHandlers;

use std::sync::Arc;

use async_trait::async_trait;
use dah::{
    AvailableData, DahError, ExchangeProxy, HostProxy, Interface, MessageRouter, ObjectLocator,
    Rectangle, Result, State, Status, TransportServer,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ApplicationConfig;
use crate::events::{ApplicationEvent, EventBus, ExchangeEvent};
use crate::exchange::{ExchangeHandlers, ExchangeService};

/// Business logic of a hosted application
#[async_trait]
pub trait ApplicationLogic: Send + Sync {
    /// Decide whether to move from `current` to `requested` at the host's request
    async fn on_state_requested(&self, current: State, requested: State) -> bool;

    /// Raise the application window into `area`
    async fn bring_to_front(&self, _area: Rectangle) -> bool {
        true
    }
}

/// Logic that accepts every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl ApplicationLogic for AcceptAll {
    async fn on_state_requested(&self, _current: State, _requested: State) -> bool {
        true
    }
}

/// State shared between the application and its handler groups
pub(crate) struct ApplicationContext {
    /// Mirror of the host-owned session state
    state: watch::Sender<State>,
    host: HostProxy,
    exchange: Arc<ExchangeService>,
    events: EventBus<ApplicationEvent>,
}

impl ApplicationContext {
    fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Update the mirror and tell the host
    async fn report_state(&self, state: State) -> Result<()> {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!("Application state {} -> {}", previous, state);
        }
        self.events.publish(ApplicationEvent::StateChanged(state));
        if state == State::Exit {
            self.exchange.clear_incoming().await;
        }
        self.host.notify_state_changed(state).await
    }
}

/// A running hosted application
pub struct HostedApplication {
    ctx: Arc<ApplicationContext>,
    router: Arc<MessageRouter>,
    url: Url,
    shutdown: CancellationToken,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl HostedApplication {
    /// Bind the application service with no control logic attached yet
    pub async fn start(config: ApplicationConfig) -> Result<Self> {
        let server_config = config
            .server_config()
            .map_err(|e| DahError::config(e.to_string()))?;
        let host_endpoint = config
            .host_endpoint()
            .map_err(|e| DahError::config(e.to_string()))?;

        let exchange = Arc::new(ExchangeService::new());
        exchange
            .set_peer(Some(ExchangeProxy::connect(host_endpoint.clone())?))
            .await;

        let ctx = Arc::new(ApplicationContext {
            state: watch::channel(State::Exit).0,
            host: HostProxy::connect(host_endpoint)?,
            exchange,
            events: EventBus::default(),
        });

        let router = Arc::new(MessageRouter::new());
        router
            .register(Arc::new(ExchangeHandlers::new(Arc::clone(&ctx.exchange))))
            .await?;

        let bound = TransportServer::new(server_config, Arc::clone(&router))
            .bind()
            .await?;
        let url = bound.url().clone();
        let shutdown = CancellationToken::new();
        let server = bound.spawn(shutdown.clone());
        info!("Hosted application serving on {}", url);

        Ok(Self {
            ctx,
            router,
            url,
            shutdown,
            server: Mutex::new(Some(server)),
        })
    }

    /// Bind the application service and attach `logic`
    pub async fn start_with_logic(
        config: ApplicationConfig,
        logic: Arc<dyn ApplicationLogic>,
    ) -> Result<Self> {
        let application = Self::start(config).await?;
        application.attach_logic(logic).await?;
        Ok(application)
    }

    /// Service URL of this application
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Local mirror of the session state
    pub fn state(&self) -> State {
        self.ctx.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<State> {
        self.ctx.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ApplicationEvent> {
        self.ctx.events.subscribe()
    }

    pub fn exchange_events(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.ctx.exchange.subscribe()
    }

    pub fn exchange(&self) -> &Arc<ExchangeService> {
        &self.ctx.exchange
    }

    /// Serve the Application control interface through `logic`.
    ///
    /// Fails with [`DahError::DuplicateRegistration`] while other logic is attached.
    pub async fn attach_logic(&self, logic: Arc<dyn ApplicationLogic>) -> Result<()> {
        self.router
            .register(Arc::new(ApplicationControlHandlers::new(
                Arc::clone(&self.ctx),
                logic,
            )))
            .await
    }

    /// Stop serving the Application control interface
    pub async fn detach_logic(&self) -> bool {
        self.router.unregister(Interface::Application).await
    }

    /// First handshake: tell the host the application is ready
    pub async fn announce_ready(&self) -> Result<()> {
        self.report_state(State::Idle).await
    }

    /// Report a state change the application made on its own
    pub async fn report_state(&self, state: State) -> Result<()> {
        self.ctx.report_state(state).await
    }

    pub async fn insert_locator(&self, id: Uuid, locator: ObjectLocator) -> bool {
        self.ctx.exchange.insert_locator(id, locator).await
    }

    /// Announce data to the host; `Ok(false)` when it is not fully cached
    pub async fn publish(&self, data: &AvailableData, last_batch: bool) -> Result<bool> {
        self.ctx.exchange.publish(data, last_batch).await
    }

    /// Data the host announced so far
    pub async fn incoming_data(&self) -> AvailableData {
        self.ctx.exchange.incoming_data().await
    }

    /// Ask the host for locators of data it announced
    pub async fn request_data(
        &self,
        ids: &[Uuid],
        acceptable_transfer_syntaxes: &[String],
        include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>> {
        self.ctx
            .exchange
            .request_data(ids, acceptable_transfer_syntaxes, include_bulk_data)
            .await
    }

    /// Tell the host its data is no longer needed
    pub async fn release_data(&self, ids: &[Uuid]) -> Result<()> {
        self.ctx.exchange.release_remote(ids).await
    }

    pub async fn generate_uid(&self) -> Result<String> {
        self.ctx.host.generate_uid().await
    }

    pub async fn available_screen(&self, preferred: Rectangle) -> Result<Rectangle> {
        self.ctx.host.get_available_screen(preferred).await
    }

    pub async fn output_location(&self, preferred_protocols: &[String]) -> Result<String> {
        self.ctx.host.get_output_location(preferred_protocols).await
    }

    pub async fn notify_status(&self, status: &Status) -> Result<()> {
        self.ctx.host.notify_status(status).await
    }

    /// Stop serving
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(server) = self.server.lock().await.take() {
            if let Err(e) = server.await {
                warn!("Application server task failed: {}", e);
            }
        }
        info!("Hosted application on {} shut down", self.url);
    }
}
