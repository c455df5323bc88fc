//! In-process ingestion source backed by a bounded `tokio` channel.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::ports::{Delivery, IngestionSource, IngestionSourceError};

/// Single-subscriber ingestion source fed through [`Self::publish`].
///
/// [`IngestionSource::close`] drops the producing half; the subscriber then
/// drains what is already queued and sees the channel close.
pub struct ChannelIngestionSource {
    sender: Mutex<Option<mpsc::Sender<Delivery>>>,
    receiver: Mutex<Option<mpsc::Receiver<Delivery>>>,
}

impl ChannelIngestionSource {
    /// Create a source queueing up to `capacity` undelivered batches.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Enqueue a batch payload, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionSourceError::Publish`] once the source is closed.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<(), IngestionSourceError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| IngestionSourceError::publish("source is closed"))?;
        sender
            .send(Delivery::new(payload))
            .await
            .map_err(|_| IngestionSourceError::publish("subscriber has gone away"))
    }
}

#[async_trait]
impl IngestionSource for ChannelIngestionSource {
    async fn subscribe(&self) -> Result<mpsc::Receiver<Delivery>, IngestionSourceError> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| IngestionSourceError::subscribe("source already has a subscriber"))
    }

    async fn close(&self) -> Result<(), IngestionSourceError> {
        let previous = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("channel ingestion source closed");
        }
        Ok(())
    }
}
