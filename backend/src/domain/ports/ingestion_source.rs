//! Port for the queue delivering user record batches.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::define_port_error;

define_port_error! {
    /// Errors raised by ingestion source adapters.
    pub enum IngestionSourceError {
        /// The source could not hand out a delivery channel.
        Subscribe { message: String } => "ingestion subscribe failed: {message}",
        /// Reading from the underlying queue failed.
        Receive { message: String } => "ingestion receive failed: {message}",
        /// A producer could not enqueue a batch.
        Publish { message: String } => "ingestion publish failed: {message}",
        /// The source could not be closed cleanly.
        Close { message: String } => "ingestion close failed: {message}",
    }
}

/// One delivery unit: an opaque batch payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delivery {
    payload: Vec<u8>,
}

impl Delivery {
    /// Wrap a raw payload.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Borrow the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Ordered, at-least-once source of batch deliveries.
///
/// Closing the returned channel signals end-of-stream to the subscriber.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngestionSource: Send + Sync {
    /// Obtain the ordered delivery channel.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Delivery>, IngestionSourceError>;

    /// Stop delivering; the subscriber's channel closes once drained.
    async fn close(&self) -> Result<(), IngestionSourceError>;
}
