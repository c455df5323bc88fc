//! Ingestion source consuming a Redis list.
//!
//! Producers `LPUSH` batches onto the list and the poller `BRPOP`s them off
//! the other end, so deliveries arrive in FIFO order. A popped batch is gone
//! from Redis once handed to the subscriber, which makes delivery
//! at-most-once per pop; upstream redelivery still yields duplicates that the
//! store rejects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::domain::ports::{Delivery, IngestionSource, IngestionSourceError};
use crate::outbound::redis_pool::RedisPool;

/// Settings for [`RedisListIngestionSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisListSettings {
    /// Name of the Redis list holding pending batches.
    pub queue_name: String,
    /// How long one `BRPOP` waits; bounds how quickly `close` is noticed.
    pub poll_timeout: Duration,
    /// Capacity of the delivery channel handed to the subscriber.
    pub channel_capacity: usize,
}

impl RedisListSettings {
    /// Settings for `queue_name` with a one second poll and a small channel.
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            poll_timeout: Duration::from_secs(1),
            channel_capacity: 16,
        }
    }
}

/// Single-subscriber source backed by a Redis list.
pub struct RedisListIngestionSource {
    pool: RedisPool,
    settings: RedisListSettings,
    closed: watch::Sender<bool>,
    subscribed: AtomicBool,
}

impl RedisListIngestionSource {
    /// Create a source over `pool`.
    pub fn new(pool: RedisPool, settings: RedisListSettings) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            pool,
            settings,
            closed,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Push a batch onto the list.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionSourceError::Publish`] if Redis is unreachable.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<(), IngestionSourceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| IngestionSourceError::publish(err.to_string()))?;
        let _length: i64 = redis::cmd("LPUSH")
            .arg(&self.settings.queue_name)
            .arg(payload.into())
            .query_async(&mut *conn)
            .await
            .map_err(|err| IngestionSourceError::publish(err.to_string()))?;
        Ok(())
    }
}

async fn pop_once(
    pool: &RedisPool,
    settings: &RedisListSettings,
) -> Result<Option<Vec<u8>>, IngestionSourceError> {
    let mut conn = pool
        .get()
        .await
        .map_err(|err| IngestionSourceError::receive(err.to_string()))?;
    let popped: Option<(String, Vec<u8>)> = redis::cmd("BRPOP")
        .arg(&settings.queue_name)
        .arg(settings.poll_timeout.as_secs_f64())
        .query_async(&mut *conn)
        .await
        .map_err(|err| IngestionSourceError::receive(err.to_string()))?;
    Ok(popped.map(|(_, payload)| payload))
}

fn is_closed(closed: &watch::Receiver<bool>) -> bool {
    *closed.borrow()
}

async fn poll(
    pool: RedisPool,
    settings: RedisListSettings,
    closed: watch::Receiver<bool>,
    deliveries: mpsc::Sender<Delivery>,
) {
    info!(queue = %settings.queue_name, "redis list poller started");
    while !is_closed(&closed) {
        match pop_once(&pool, &settings).await {
            Ok(Some(payload)) => {
                if deliveries.send(Delivery::new(payload)).await.is_err() {
                    warn!(queue = %settings.queue_name, "subscriber went away; poller exiting");
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(queue = %settings.queue_name, error = %err, "redis list poll failed; backing off");
                tokio::time::sleep(settings.poll_timeout).await;
            }
        }
    }
    info!(queue = %settings.queue_name, "redis list poller stopped");
}

#[async_trait]
impl IngestionSource for RedisListIngestionSource {
    async fn subscribe(&self) -> Result<mpsc::Receiver<Delivery>, IngestionSourceError> {
        if self.subscribed.swap(true, Ordering::AcqRel) {
            return Err(IngestionSourceError::subscribe(
                "source already has a subscriber",
            ));
        }
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        tokio::spawn(poll(
            self.pool.clone(),
            self.settings.clone(),
            self.closed.subscribe(),
            tx,
        ));
        Ok(rx)
    }

    async fn close(&self) -> Result<(), IngestionSourceError> {
        self.closed.send_replace(true);
        Ok(())
    }
}
