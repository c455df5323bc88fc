//! Decoder stage: raw batch bytes to user records.
//!
//! A batch decodes whole or not at all. A malformed batch yields exactly one
//! decode error and forwards nothing; an empty payload is skipped silently.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{PipelineError, UserRecord};

use super::error_sink::ErrorReporter;

/// Counters kept by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DecodeStats {
    pub(crate) batches_decoded: u64,
    pub(crate) batches_rejected: u64,
    pub(crate) batches_skipped: u64,
    pub(crate) records_decoded: u64,
}

/// Parse a batch payload into records.
pub(crate) fn decode_batch(payload: &[u8]) -> Result<Vec<UserRecord>, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Run until `input` closes; closing `output` on return.
pub(crate) async fn run_decoder(
    mut input: mpsc::Receiver<Vec<u8>>,
    output: mpsc::Sender<Vec<UserRecord>>,
    errors: ErrorReporter,
) -> DecodeStats {
    info!("decoder stage started");
    let mut stats = DecodeStats::default();
    while let Some(payload) = input.recv().await {
        if payload.is_empty() {
            stats.batches_skipped += 1;
            continue;
        }
        match decode_batch(&payload) {
            Ok(records) => {
                stats.batches_decoded += 1;
                stats.records_decoded += u64::try_from(records.len()).unwrap_or(u64::MAX);
                debug!(records = records.len(), "decoded batch");
                if records.is_empty() {
                    continue;
                }
                if output.send(records).await.is_err() {
                    warn!("persister stage stopped early; decoder exiting");
                    break;
                }
            }
            Err(err) => {
                stats.batches_rejected += 1;
                errors.report(PipelineError::decode(err.to_string(), payload));
            }
        }
    }
    info!(
        decoded = stats.batches_decoded,
        rejected = stats.batches_rejected,
        "decoder stage stopped"
    );
    stats
}
