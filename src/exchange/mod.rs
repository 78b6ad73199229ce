//! Data exchange: locator cache, incoming announcements and the peer link

mod cache;
mod handlers;
mod incoming;

pub use cache::LocatorCache;
pub use handlers::ExchangeHandlers;
pub use incoming::IncomingData;

use dah::{AvailableData, DahError, ExchangeProxy, ObjectLocator, Result};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{EventBus, ExchangeEvent};

/// One side's end of the symmetric data exchange.
///
/// The cache and the incoming buffer are shared between local callers and
/// connection workers; each sits behind its own lock.
#[derive(Debug, Default)]
pub struct ExchangeService {
    cache: Mutex<LocatorCache>,
    incoming: Mutex<IncomingData>,
    peer: RwLock<Option<ExchangeProxy>>,
    events: EventBus<ExchangeEvent>,
}

impl ExchangeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the peer's exchange endpoint
    pub async fn set_peer(&self, peer: Option<ExchangeProxy>) {
        if let Some(peer) = &peer {
            debug!("Exchange peer set to {}", peer.client().endpoint().url);
        }
        *self.peer.write().await = peer;
    }

    pub async fn has_peer(&self) -> bool {
        self.peer.read().await.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.events.subscribe()
    }

    pub async fn insert_locator(&self, id: Uuid, locator: ObjectLocator) -> bool {
        self.cache.lock().await.insert(id, locator)
    }

    pub async fn find(&self, id: &Uuid) -> Option<ObjectLocator> {
        self.cache.lock().await.find(id).cloned()
    }

    pub async fn is_fully_cached(&self, data: &AvailableData) -> bool {
        self.cache.lock().await.is_fully_cached(data)
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Announce `data` to the peer.
    ///
    /// Returns `Ok(false)` without contacting the peer when any descriptor in
    /// `data` has no cached locator.
    pub async fn publish(&self, data: &AvailableData, last_batch: bool) -> Result<bool> {
        if !self.is_fully_cached(data).await {
            warn!("Not publishing: announcement references descriptors with no cached locator");
            return Ok(false);
        }

        let peer = self.peer().await?;
        let accepted = peer.notify_data_available(data, last_batch).await?;
        info!(
            "Published {} descriptors (last batch: {}), peer accepted: {}",
            data.all_descriptors().count(),
            last_batch,
            accepted
        );
        Ok(accepted)
    }

    /// Serve a `getData` request from the local cache
    pub async fn get_data(
        &self,
        ids: &[Uuid],
        acceptable_transfer_syntaxes: &[String],
        include_bulk_data: bool,
    ) -> Vec<ObjectLocator> {
        debug!(
            "getData for {} ids (transfer syntaxes: {:?}, bulk data: {})",
            ids.len(),
            acceptable_transfer_syntaxes,
            include_bulk_data
        );
        self.cache.lock().await.get_data(ids)
    }

    /// Serve a `releaseData` request; the released locators leave the cache
    pub async fn release_data(&self, ids: &[Uuid]) -> usize {
        let removed = self.cache.lock().await.remove(ids);
        debug!("Released {} of {} ids", removed, ids.len());
        self.events.publish(ExchangeEvent::DataReleased { ids: ids.to_vec() });
        removed
    }

    /// Record an announcement from the peer
    pub async fn on_data_available(&self, data: AvailableData, last_batch: bool) -> bool {
        let descriptors: Vec<_> = data.all_descriptors().cloned().collect();
        self.incoming.lock().await.append(data, last_batch);
        info!(
            "Received {} descriptors (last batch: {})",
            descriptors.len(),
            last_batch
        );
        self.events.publish(ExchangeEvent::DataAvailable {
            last_batch,
            descriptors,
        });
        true
    }

    /// Everything the peer announced so far, merged
    pub async fn incoming_data(&self) -> AvailableData {
        self.incoming.lock().await.data().clone()
    }

    pub async fn incoming_last_batch(&self) -> bool {
        self.incoming.lock().await.last_batch()
    }

    pub async fn clear_incoming(&self) {
        let mut incoming = self.incoming.lock().await;
        if incoming.batches() > 0 {
            debug!("Discarding {} incoming announcements", incoming.batches());
        }
        incoming.clear();
    }

    /// Ask the peer for locators of data it announced
    pub async fn request_data(
        &self,
        ids: &[Uuid],
        acceptable_transfer_syntaxes: &[String],
        include_bulk_data: bool,
    ) -> Result<Vec<ObjectLocator>> {
        self.peer()
            .await?
            .get_data(ids, acceptable_transfer_syntaxes, include_bulk_data)
            .await
    }

    /// Tell the peer its data is no longer needed
    pub async fn release_remote(&self, ids: &[Uuid]) -> Result<()> {
        self.peer().await?.release_data(ids).await
    }

    async fn peer(&self) -> Result<ExchangeProxy> {
        self.peer
            .read()
            .await
            .clone()
            .ok_or_else(|| DahError::transport("no exchange peer attached"))
    }
}
