//! Central consumer of pipeline errors.
//!
//! Producers never block on error reporting. They `try_send` into a bounded
//! queue; when it is full the newest error is dropped, counted and logged.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use crate::domain::{PipelineError, PipelineErrorKind, UserId};

/// Per-kind count of errors observed by the sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTally {
    counts: BTreeMap<PipelineErrorKind, u64>,
    dropped: u64,
}

impl ErrorTally {
    /// Number of observed errors of `kind`.
    pub fn count(&self, kind: PipelineErrorKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Number of errors observed across all kinds.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Errors discarded because the sink queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record(&mut self, kind: PipelineErrorKind) {
        *self.counts.entry(kind).or_default() += 1;
    }
}

/// Non-blocking handle stages use to report errors.
#[derive(Clone)]
pub(crate) struct ErrorReporter {
    tx: mpsc::Sender<PipelineError>,
    dropped: Arc<AtomicU64>,
}

impl ErrorReporter {
    pub(crate) fn report(&self, err: PipelineError) {
        match self.tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind = %err.kind(), error = %err, "error sink full; dropping newest error");
            }
            Err(TrySendError::Closed(err)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind = %err.kind(), error = %err, "error sink closed; dropping error");
            }
        }
    }
}

/// Receiving half of the error queue plus the shared drop counter.
pub(crate) struct ErrorSink {
    rx: mpsc::Receiver<PipelineError>,
    dropped: Arc<AtomicU64>,
}

/// Create a reporter and sink joined by a queue of `capacity` errors.
pub(crate) fn error_channel(capacity: usize) -> (ErrorReporter, ErrorSink) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ErrorReporter {
            tx,
            dropped: Arc::clone(&dropped),
        },
        ErrorSink { rx, dropped },
    )
}

impl ErrorSink {
    /// Consume errors until every reporter is dropped.
    pub(crate) async fn run(mut self) -> ErrorTally {
        info!("error sink started");
        let mut tally = ErrorTally::default();
        while let Some(err) = self.rx.recv().await {
            log_error(&err);
            tally.record(err.kind());
        }
        tally.dropped = self.dropped.load(Ordering::Relaxed);
        info!(
            observed = tally.total(),
            dropped = tally.dropped,
            "error sink stopped"
        );
        tally
    }
}

fn log_error(err: &PipelineError) {
    let record_id = err.record_id().map(UserId::get);
    let payload_len = err.payload().map(<[u8]>::len);
    if err.kind() == PipelineErrorKind::Duplicate {
        warn!(kind = %err.kind(), ?record_id, error = %err.message(), "record already persisted");
    } else {
        error!(kind = %err.kind(), ?record_id, ?payload_len, error = %err.message(), "pipeline error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn full_queue_drops_newest_without_blocking() {
        let (reporter, sink) = error_channel(2);
        for id in 1..=5 {
            reporter.report(PipelineError::timeout(UserId::new(id), Duration::from_secs(1)));
        }
        drop(reporter);

        let tally = sink.run().await;
        assert_eq!(tally.count(PipelineErrorKind::Timeout), 2);
        assert_eq!(tally.dropped(), 3);
    }

    #[tokio::test]
    async fn tally_counts_each_kind() {
        let (reporter, sink) = error_channel(8);
        reporter.report(PipelineError::decode("bad json", b"[".to_vec()));
        reporter.report(PipelineError::encrypt(UserId::new(1), "no key"));
        reporter.report(PipelineError::encrypt(UserId::new(2), "no key"));
        drop(reporter);

        let tally = sink.run().await;
        assert_eq!(tally.count(PipelineErrorKind::Decode), 1);
        assert_eq!(tally.count(PipelineErrorKind::Encrypt), 2);
        assert_eq!(tally.count(PipelineErrorKind::Store), 0);
        assert_eq!(tally.total(), 3);
    }
}
