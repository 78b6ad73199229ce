//! Host role: owns the session state and serves the Host interface

mod handlers;
pub mod launcher;

pub use handlers::HostControlHandlers;
pub use launcher::ApplicationProcess;

use std::sync::Arc;

use dah::{
    ApplicationProxy, AvailableData, DahError, ExchangeProxy, MessageRouter, ObjectLocator,
    PeerEndpoint, Rectangle, Result, State, TransportServer,
};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::HostConfig;
use crate::events::{EventBus, ExchangeEvent, HostEvent};
use crate::exchange::{ExchangeHandlers, ExchangeService};
use crate::state::StateMachine;
use crate::storage::StorageBackend;

/// State shared between the host and its handler groups
pub(crate) struct HostContext {
    pub(crate) state: StateMachine,
    pub(crate) exchange: Arc<ExchangeService>,
    pub(crate) events: EventBus<HostEvent>,
    pub(crate) storage: Arc<dyn StorageBackend>,
    pub(crate) screen: Rectangle,
    /// Output directory of this session, relative to the storage root
    pub(crate) output_dir: String,
}

/// How an exit sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The application reported `EXIT` in time
    Graceful,
    /// The application did not report `EXIT`; its process was killed
    ForceTerminated,
    /// The application did not report `EXIT` and there was no process to kill
    TimedOut,
}

/// A running host
pub struct Host {
    ctx: Arc<HostContext>,
    config: HostConfig,
    url: Url,
    application: RwLock<Option<ApplicationProxy>>,
    process: Mutex<Option<ApplicationProcess>>,
    shutdown: CancellationToken,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl Host {
    /// Bind the host service and start serving.
    ///
    /// The application configured under `application_url` is attached as the
    /// peer; call [`Host::attach_application`] to point elsewhere.
    pub async fn start(config: HostConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        let server_config = config
            .server_config()
            .map_err(|e| DahError::config(e.to_string()))?;
        let application_endpoint = config
            .application_endpoint()
            .map_err(|e| DahError::config(e.to_string()))?;

        let ctx = Arc::new(HostContext {
            state: StateMachine::new(),
            exchange: Arc::new(ExchangeService::new()),
            events: EventBus::default(),
            storage,
            screen: config.screen.into(),
            output_dir: format!("session-{}", Uuid::new_v4()),
        });

        let router = Arc::new(MessageRouter::new());
        router
            .register(Arc::new(HostControlHandlers::new(Arc::clone(&ctx))))
            .await?;
        router
            .register(Arc::new(ExchangeHandlers::new(Arc::clone(&ctx.exchange))))
            .await?;

        let bound = TransportServer::new(server_config, router).bind().await?;
        let url = bound.url().clone();
        let shutdown = CancellationToken::new();
        let server = bound.spawn(shutdown.clone());
        info!("Host serving on {}", url);

        let host = Self {
            ctx,
            config,
            url,
            application: RwLock::new(None),
            process: Mutex::new(None),
            shutdown,
            server: Mutex::new(Some(server)),
        };
        host.attach_application(application_endpoint).await?;
        Ok(host)
    }

    /// Service URL of this host
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host-owned session state
    pub fn state(&self) -> State {
        self.ctx.state.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<State> {
        self.ctx.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<HostEvent> {
        self.ctx.events.subscribe()
    }

    pub fn exchange_events(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.ctx.exchange.subscribe()
    }

    pub fn exchange(&self) -> &Arc<ExchangeService> {
        &self.ctx.exchange
    }

    /// Point the host at the application's service URL
    pub async fn attach_application(&self, endpoint: PeerEndpoint) -> Result<()> {
        endpoint.validate()?;
        debug!("Attaching application at {}", endpoint.url);
        let control = ApplicationProxy::connect(endpoint.clone())?;
        let exchange = ExchangeProxy::connect(endpoint)?;
        *self.application.write().await = Some(control);
        self.ctx.exchange.set_peer(Some(exchange)).await;
        Ok(())
    }

    pub async fn detach_application(&self) {
        *self.application.write().await = None;
        self.ctx.exchange.set_peer(None).await;
    }

    async fn application(&self) -> Result<ApplicationProxy> {
        self.application
            .read()
            .await
            .clone()
            .ok_or_else(|| DahError::transport("no application attached"))
    }

    /// Ask the application for its view of the session state
    pub async fn application_state(&self) -> Result<State> {
        self.application().await?.get_state().await
    }

    /// Request a state change from the application
    pub async fn set_application_state(&self, state: State) -> Result<bool> {
        let accepted = self.application().await?.set_state(state).await?;
        if !accepted {
            warn!("Application refused transition to {}", state);
        }
        Ok(accepted)
    }

    pub async fn bring_application_to_front(&self, area: Rectangle) -> Result<bool> {
        self.application().await?.bring_to_front(area).await
    }

    pub async fn insert_locator(&self, id: Uuid, locator: ObjectLocator) -> bool {
        self.ctx.exchange.insert_locator(id, locator).await
    }

    /// Announce data to the application; `Ok(false)` when it is not fully cached
    pub async fn publish(&self, data: &AvailableData, last_batch: bool) -> Result<bool> {
        self.ctx.exchange.publish(data, last_batch).await
    }

    /// Data the application announced so far
    pub async fn incoming_data(&self) -> AvailableData {
        self.ctx.exchange.incoming_data().await
    }

    /// Ask the application for locators of data it announced
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

    /// Tell the application its data is no longer needed
    pub async fn release_data(&self, ids: &[Uuid]) -> Result<()> {
        self.ctx.exchange.release_remote(ids).await
    }

    /// Start the configured application command; returns its pid
    pub async fn launch_application(&self) -> Result<Option<u32>> {
        let mut process = self.process.lock().await;
        if process.is_some() {
            return Err(DahError::internal("application already launched"));
        }
        let application_url = self
            .config
            .application_endpoint()
            .map_err(|e| DahError::config(e.to_string()))?
            .url;
        let launched = ApplicationProcess::spawn(&self.config.launch, &self.url, &application_url)?;
        let pid = launched.id();
        *process = Some(launched);
        Ok(pid)
    }

    /// Ask the application to exit and wait for it to report `EXIT`.
    ///
    /// A launched process that does not exit within the timeout is killed.
    pub async fn exit_application(&self) -> Result<ExitOutcome> {
        let timeout = self.config.exit_timeout();
        info!("Requesting application exit (timeout {:?})", timeout);

        // Only an EXIT reported after this point counts; the session starts in EXIT.
        let mut state = self.ctx.state.subscribe();
        state.borrow_and_update();

        if let Err(e) = self.set_application_state(State::Exit).await {
            warn!("setState(EXIT) failed: {}", e);
        }

        let reported = tokio::time::timeout(timeout, async {
            while state.changed().await.is_ok() {
                if *state.borrow_and_update() == State::Exit {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        let mut process = self.process.lock().await;
        let outcome = match process.as_mut() {
            Some(child) if reported => {
                if child.wait_timeout(timeout).await?.is_none() {
                    warn!("Application reported EXIT but its process is still running");
                    child.kill().await?;
                }
                ExitOutcome::Graceful
            }
            Some(child) => {
                child.kill().await?;
                ExitOutcome::ForceTerminated
            }
            None if reported => ExitOutcome::Graceful,
            None => ExitOutcome::TimedOut,
        };
        *process = None;

        info!("Application exit sequence finished: {:?}", outcome);
        Ok(outcome)
    }

    /// Stop serving and kill any launched process
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(server) = self.server.lock().await.take() {
            if let Err(e) = server.await {
                warn!("Host server task failed: {}", e);
            }
        }
        if let Some(mut child) = self.process.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill application process: {}", e);
            }
        }
        info!("Host on {} shut down", self.url);
    }
}
