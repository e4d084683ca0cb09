//! Bounded fan-out of asset transfers.

use std::collections::VecDeque;
use std::future::Future;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{debug, warn};

use sylva_fetch::{FetchError, TransferOutcome, TransferSummary};

use crate::TransferRequest;

/// Accounting for one drained batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Keys whose content was (re)written locally.
    pub completed: Vec<String>,
    /// Keys whose local copy was already current.
    pub not_modified: Vec<String>,
    /// Keys that could not be reconciled, with the terminal error.
    pub failed: Vec<(String, FetchError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.not_modified.len() + self.failed.len()
    }
}

/// Drive every request through `transfer_fn`, at most `max_connections`
/// at a time.
///
/// Admission and bookkeeping happen on the calling task: a request leaves
/// the FIFO pending queue only when a slot is free, and each settled
/// transfer is recorded before more work is admitted, so the in-flight
/// count never exceeds the ceiling. Returns exactly once, when the queue
/// is empty and nothing is in flight.
///
/// Individual failures are recorded in the report and never abort the
/// batch; one bad asset cannot block the rest.
pub async fn run_transfers<F, Fut>(
    requests: Vec<TransferRequest>,
    max_connections: usize,
    transfer_fn: F,
) -> BatchReport
where
    F: Fn(TransferRequest) -> Fut,
    Fut: Future<Output = Result<TransferSummary, FetchError>>,
{
    let cap = if max_connections < 1 {
        warn!("max_connections < 1 is unusable; clamping to 1");
        1
    } else {
        max_connections
    };

    let transfer_fn = &transfer_fn;
    let mut pending: VecDeque<TransferRequest> = requests.into();
    let mut in_flight = FuturesUnordered::new();
    let mut report = BatchReport::default();

    loop {
        while in_flight.len() < cap {
            let Some(request) = pending.pop_front() else { break };
            let key = request.remote_key.clone();
            in_flight.push(async move { (key, transfer_fn(request).await) });
        }

        let Some((key, result)) = in_flight.next().await else {
            break;
        };
        match result {
            Ok(summary) => {
                debug!(key = %key, outcome = ?summary.outcome, "transfer settled");
                match summary.outcome {
                    TransferOutcome::Completed => report.completed.push(key),
                    TransferOutcome::NotModified => report.not_modified.push(key),
                }
            }
            Err(error) => {
                warn!(key = %key, %error, "asset transfer failed");
                report.failed.push((key, error));
            }
        }
    }

    report
}
