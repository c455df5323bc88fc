//! Persister stage: encrypt, write through to the store, then the cache.
//!
//! Records are handled strictly in arrival order. A failing record is
//! reported and skipped; the rest of its batch is still attempted and
//! nothing is retried.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::ports::{PiiCipher, UserCache, UserStore};
use crate::domain::write_through::{CacheWrite, Timeouts, WriteError, write_through};
use crate::domain::{PipelineError, UserRecord};

use super::error_sink::ErrorReporter;

/// Counters kept by the persister.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PersistStats {
    pub(crate) records_persisted: u64,
    pub(crate) records_failed: u64,
    pub(crate) cache_writes_failed: u64,
}

pub(crate) struct Persister {
    pub(crate) store: Arc<dyn UserStore>,
    pub(crate) cache: Arc<dyn UserCache>,
    pub(crate) cipher: Arc<dyn PiiCipher>,
    pub(crate) timeouts: Timeouts,
    pub(crate) errors: ErrorReporter,
}

impl Persister {
    /// Run until `input` closes. Dropping `self` on return releases this
    /// stage's error reporter, which lets the sink finish.
    pub(crate) async fn run(self, mut input: mpsc::Receiver<Vec<UserRecord>>) -> PersistStats {
        info!("persister stage started");
        let mut stats = PersistStats::default();
        while let Some(batch) = input.recv().await {
            for record in batch {
                self.persist(record, &mut stats).await;
            }
        }
        info!(
            persisted = stats.records_persisted,
            failed = stats.records_failed,
            "persister stage stopped"
        );
        stats
    }

    async fn persist(&self, record: UserRecord, stats: &mut PersistStats) {
        let id = record.id;
        let sealed = match record.seal(self.cipher.as_ref()) {
            Ok(sealed) => sealed,
            Err(err) => {
                stats.records_failed += 1;
                self.errors.report(PipelineError::encrypt(id, err.to_string()));
                return;
            }
        };

        match write_through(
            self.store.as_ref(),
            self.cache.as_ref(),
            &sealed,
            self.timeouts,
        )
        .await
        {
            Ok(cache_write) => {
                stats.records_persisted += 1;
                if cache_write == CacheWrite::Skipped {
                    stats.cache_writes_failed += 1;
                }
                debug!(record_id = %id, "record persisted");
            }
            Err(WriteError::Timeout(after)) => {
                stats.records_failed += 1;
                self.errors.report(PipelineError::timeout(id, after));
            }
            Err(WriteError::Store(err)) => {
                stats.records_failed += 1;
                self.errors.report(PipelineError::from_store(id, &err));
            }
        }
    }
}
