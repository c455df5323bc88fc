//! Staged ingestion pipeline.
//!
//! Batches flow from the [`IngestionSource`] through a feeder into the
//! decoder, then the persister, with failures funnelled to the error sink.
//! Stages are long-lived tasks joined by bounded channels, so a slow
//! persister stalls the decoder, which in turn stalls consumption from the
//! source.
//!
//! Shutdown is cooperative. When the source closes its delivery channel the
//! feeder drops the decoder's input; each stage finishes what it already
//! read, drops its output and exits. The error sink ends once both the
//! decoder and persister have released their reporters.
//! [`RunningPipeline::join`] waits for every task before reporting
//! [`PipelineState::Stopped`].

mod decoder;
mod error_sink;
mod persister;

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use crate::domain::ports::{
    Delivery, IngestionSource, IngestionSourceError, PiiCipher, UserCache, UserStore,
};
use crate::domain::write_through::Timeouts;

use self::decoder::{DecodeStats, run_decoder};
use self::error_sink::error_channel;
use self::persister::{PersistStats, Persister};

pub use self::error_sink::ErrorTally;

/// Port bundle required by the ingestion pipeline.
pub struct IngestionPorts {
    /// Source of batch deliveries.
    pub source: Arc<dyn IngestionSource>,
    /// Durable store written by the persister.
    pub store: Arc<dyn UserStore>,
    /// Cache written after each successful store write.
    pub cache: Arc<dyn UserCache>,
    /// Cipher protecting the email field.
    pub cipher: Arc<dyn PiiCipher>,
}

impl IngestionPorts {
    /// Build a strongly-typed pipeline port bundle.
    pub fn new(
        source: Arc<dyn IngestionSource>,
        store: Arc<dyn UserStore>,
        cache: Arc<dyn UserCache>,
        cipher: Arc<dyn PiiCipher>,
    ) -> Self {
        Self {
            source,
            store,
            cache,
            cipher,
        }
    }
}

/// Tuning for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionSettings {
    /// Capacity of the error sink queue.
    pub error_buffer: usize,
    /// Deadlines for store and cache writes.
    pub timeouts: Timeouts,
}

impl IngestionSettings {
    /// Default capacity of the error sink queue.
    pub const DEFAULT_ERROR_BUFFER: usize = 1024;
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            error_buffer: Self::DEFAULT_ERROR_BUFFER,
            timeouts: Timeouts::default(),
        }
    }
}

/// Lifecycle of a pipeline. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Built but not started.
    Init,
    /// Stages live and consuming the source.
    Running,
    /// Source closed; stages finishing in-flight work.
    Draining,
    /// Every stage has exited.
    Stopped,
}

impl PipelineState {
    /// Stable lowercase name used in logs and probes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals gathered from every stage once the pipeline stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Deliveries taken from the source.
    pub batches_received: u64,
    /// Batches decoded successfully.
    pub batches_decoded: u64,
    /// Batches rejected as malformed.
    pub batches_rejected: u64,
    /// Records forwarded to the persister.
    pub records_decoded: u64,
    /// Records durably written to the store.
    pub records_persisted: u64,
    /// Records dropped after a pipeline error.
    pub records_failed: u64,
    /// Successful store writes whose cache write failed.
    pub cache_writes_failed: u64,
    /// Errors observed by the sink.
    pub errors: ErrorTally,
}

/// Failures starting or joining a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestionPipelineError {
    /// The source refused to hand out a delivery channel.
    #[error("failed to subscribe to ingestion source: {0}")]
    Subscribe(#[from] IngestionSourceError),
    /// A stage task panicked or was cancelled.
    #[error("pipeline stage {stage} failed: {message}")]
    Stage {
        /// Name of the failed stage.
        stage: &'static str,
        /// Join failure description.
        message: String,
    },
}

fn stage_failed(stage: &'static str, err: &JoinError) -> IngestionPipelineError {
    IngestionPipelineError::Stage {
        stage,
        message: err.to_string(),
    }
}

/// A pipeline that has not been started yet.
pub struct IngestionPipeline {
    ports: IngestionPorts,
    settings: IngestionSettings,
    state: Arc<watch::Sender<PipelineState>>,
}

impl IngestionPipeline {
    /// Create a pipeline in [`PipelineState::Init`].
    pub fn new(ports: IngestionPorts, settings: IngestionSettings) -> Self {
        let (state, _) = watch::channel(PipelineState::Init);
        Self {
            ports,
            settings,
            state: Arc::new(state),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Observe state transitions, including those after [`Self::start`].
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Spawn the stages with channels of `buffer_size` and begin consuming.
    ///
    /// A pipeline runs once; there is no restart after it stops.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionPipelineError::Subscribe`] if the source cannot be
    /// subscribed to. The pipeline is then [`PipelineState::Stopped`].
    pub async fn start(self, buffer_size: usize) -> Result<RunningPipeline, IngestionPipelineError> {
        let Self {
            ports,
            settings,
            state,
        } = self;

        let deliveries = match ports.source.subscribe().await {
            Ok(deliveries) => deliveries,
            Err(err) => {
                state.send_replace(PipelineState::Stopped);
                return Err(err.into());
            }
        };

        let capacity = buffer_size.max(1);
        let (batch_tx, batch_rx) = mpsc::channel(capacity);
        let (record_tx, record_rx) = mpsc::channel(capacity);
        let (reporter, sink) = error_channel(settings.error_buffer);

        let sink = tokio::spawn(sink.run());
        let persister = tokio::spawn(
            Persister {
                store: ports.store,
                cache: ports.cache,
                cipher: ports.cipher,
                timeouts: settings.timeouts,
                errors: reporter.clone(),
            }
            .run(record_rx),
        );
        let decoder = tokio::spawn(run_decoder(batch_rx, record_tx, reporter));

        state.send_replace(PipelineState::Running);
        let feeder = tokio::spawn(feed(deliveries, batch_tx, Arc::clone(&state)));
        info!(buffer_size = capacity, "ingestion pipeline running");

        Ok(RunningPipeline {
            source: ports.source,
            state,
            feeder,
            decoder,
            persister,
            sink,
        })
    }
}

/// Forward deliveries to the decoder until the source closes.
async fn feed(
    mut deliveries: mpsc::Receiver<Delivery>,
    batches: mpsc::Sender<Vec<u8>>,
    state: Arc<watch::Sender<PipelineState>>,
) -> u64 {
    let mut received = 0_u64;
    while let Some(delivery) = deliveries.recv().await {
        received += 1;
        if batches.send(delivery.into_payload()).await.is_err() {
            warn!("decoder stage stopped early; feeder exiting");
            break;
        }
    }
    state.send_replace(PipelineState::Draining);
    info!(batches = received, "ingestion source closed; draining");
    received
}

/// Handle to a started pipeline.
pub struct RunningPipeline {
    source: Arc<dyn IngestionSource>,
    state: Arc<watch::Sender<PipelineState>>,
    feeder: JoinHandle<u64>,
    decoder: JoinHandle<DecodeStats>,
    persister: JoinHandle<PersistStats>,
    sink: JoinHandle<ErrorTally>,
}

impl RunningPipeline {
    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Wait for the source to close and every stage to drain and exit.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionPipelineError::Stage`] if a stage panicked. The
    /// remaining stages are still awaited and the state still becomes
    /// [`PipelineState::Stopped`].
    pub async fn join(self) -> Result<PipelineReport, IngestionPipelineError> {
        let Self {
            state,
            feeder,
            decoder,
            persister,
            sink,
            ..
        } = self;

        let received = feeder.await;
        let decoded = decoder.await;
        let persisted = persister.await;
        let errors = sink.await;
        state.send_replace(PipelineState::Stopped);

        let batches_received = received.map_err(|err| stage_failed("feeder", &err))?;
        let decoded = decoded.map_err(|err| stage_failed("decoder", &err))?;
        let persisted = persisted.map_err(|err| stage_failed("persister", &err))?;
        let errors = errors.map_err(|err| stage_failed("error sink", &err))?;

        let report = PipelineReport {
            batches_received,
            batches_decoded: decoded.batches_decoded,
            batches_rejected: decoded.batches_rejected,
            records_decoded: decoded.records_decoded,
            records_persisted: persisted.records_persisted,
            records_failed: persisted.records_failed,
            cache_writes_failed: persisted.cache_writes_failed,
            errors,
        };
        info!(
            batches = report.batches_received,
            persisted = report.records_persisted,
            failed = report.records_failed,
            errors = report.errors.total(),
            dropped_errors = report.errors.dropped(),
            "ingestion pipeline stopped"
        );
        Ok(report)
    }

    /// Close the source, then [`join`](Self::join).
    ///
    /// In-flight records are allowed to finish.
    ///
    /// # Errors
    ///
    /// See [`Self::join`]. A failure to close the source is logged and the
    /// join still proceeds.
    pub async fn shutdown(self) -> Result<PipelineReport, IngestionPipelineError> {
        if let Err(err) = self.source.close().await {
            warn!(error = %err, "ingestion source close failed");
        }
        self.join().await
    }
}
