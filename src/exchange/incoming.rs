use chrono::{DateTime, Utc};
use dah::AvailableData;

/// Accumulates data announcements received from the peer
#[derive(Debug, Default)]
pub struct IncomingData {
    data: AvailableData,
    last_batch: bool,
    batches: usize,
    last_received: Option<DateTime<Utc>>,
}

impl IncomingData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one announcement into the buffer
    pub fn append(&mut self, data: AvailableData, last_batch: bool) {
        self.data.append(data);
        self.last_batch = last_batch;
        self.batches += 1;
        self.last_received = Some(Utc::now());
    }

    pub fn data(&self) -> &AvailableData {
        &self.data
    }

    /// Last-batch flag of the most recent announcement
    pub fn last_batch(&self) -> bool {
        self.last_batch
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn last_received(&self) -> Option<DateTime<Utc>> {
        self.last_received
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
