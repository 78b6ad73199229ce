//! Transport Server accepting inbound calls from the peer process

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use url::Url;

use crate::codec::{self, Fault, FaultCode, Reply};
use crate::config::ServerConfig;
use crate::framing::{HttpFraming, InboundRequest, OutboundResponse};
use crate::interface::{self, DEFINITION_QUERY, SCHEMA_QUERY};
use crate::router::MessageRouter;
use crate::{DahError, Result};

/// Transport Server, not yet bound
pub struct TransportServer {
    config: ServerConfig,
    router: Arc<MessageRouter>,
}

/// Transport Server bound to its local address
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    url: Url,
    shared: Arc<Shared>,
}

struct Shared {
    config: ServerConfig,
    router: Arc<MessageRouter>,
    service_url: String,
}

impl TransportServer {
    pub fn new(config: ServerConfig, router: Arc<MessageRouter>) -> Self {
        Self { config, router }
    }

    /// Bind the listener; port 0 picks a free port
    pub async fn bind(self) -> Result<BoundServer> {
        self.config.validate()?;

        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{}{}", local_addr, self.config.path))
            .map_err(|e| DahError::config(format!("invalid service URL: {}", e)))?;

        info!("Transport server bound on {}", url);

        Ok(BoundServer {
            listener,
            local_addr,
            shared: Arc::new(Shared {
                config: self.config,
                router: self.router,
                service_url: url.to_string(),
            }),
            url,
        })
    }
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Service URL peers use to reach this server
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Accept connections until `shutdown` is cancelled.
    ///
    /// Each connection is served by its own worker task; at most
    /// `max_connections` workers run at once.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let workers = Arc::new(Semaphore::new(self.shared.config.max_connections));

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer_addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    continue;
                }
            };
            debug!("Accepted connection from {}", peer_addr);

            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&workers).acquire_owned() => permit
                    .map_err(|_| DahError::internal("worker pool closed"))?,
            };

            let shared = Arc::clone(&self.shared);
            let span = tracing::debug_span!("connection", peer = %peer_addr);
            tokio::spawn(
                async move {
                    if let Err(e) = shared.handle_connection(stream).await {
                        warn!("Connection from {} terminated: {}", peer_addr, e);
                    }
                    drop(permit);
                }
                .instrument(span),
            );
        }

        info!("Transport server on {} stopped", self.url);
        Ok(())
    }

    /// Run [`BoundServer::serve`] on a background task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let url = self.url.clone();
            if let Err(e) = self.serve(shutdown).await {
                error!("Transport server on {} failed: {}", url, e);
            }
        })
    }
}

impl Shared {
    async fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let mut framed = Framed::new(stream, HttpFraming::new(self.config.max_body_bytes));

        let request = match framed.next().await {
            Some(Ok(request)) => request,
            Some(Err(e)) => {
                let _ = framed
                    .send(OutboundResponse::text(400, e.to_string()))
                    .await;
                return Err(e);
            }
            None => return Ok(()),
        };

        let response = self.respond(request).await;
        framed.send(response).await?;
        Ok(())
    }

    async fn respond(&self, request: InboundRequest) -> OutboundResponse {
        if request.path() != self.config.path {
            debug!("Request for unknown path '{}'", request.path());
            return OutboundResponse::text(404, format!("no service at {}", request.path()));
        }

        match request.query() {
            Some(DEFINITION_QUERY) => {
                let interfaces = self.router.interfaces().await;
                let doc = interface::definition_document(&interfaces, &self.service_url);
                return OutboundResponse::json(200, doc);
            }
            Some(SCHEMA_QUERY) => {
                return OutboundResponse::json(200, interface::schema_document(&self.service_url));
            }
            _ => {}
        }

        if request.method != "POST" {
            return OutboundResponse::text(405, format!("{} is not supported", request.method));
        }

        let call = match codec::decode_call(&request.body) {
            Ok(call) => call,
            Err(e) => {
                warn!("Undecodable call: {}", e);
                return Self::reply(
                    400,
                    &Reply::Fault(Fault::new(FaultCode::InvalidArguments, e.to_string())),
                );
            }
        };

        debug!("Dispatching {}", call.method);
        let reply = self.router.process(&call).await.into_reply(&call.method);
        let status = if reply.is_fault() { 500 } else { 200 };
        Self::reply(status, &reply)
    }

    fn reply(status: u16, reply: &Reply) -> OutboundResponse {
        match codec::encode_reply(reply) {
            Ok(body) => OutboundResponse::json(status, body),
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                OutboundResponse::text(500, e.to_string())
            }
        }
    }
}
