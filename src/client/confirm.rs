//! Confirmation polling for submitted transactions
//!
//! A submitted transaction moves `Submitted -> Pending -> {Committed, Failed}`
//! on the node. The wait ends in one of those terminal states, in `TimedOut`
//! when the deadline passes first, or in `Cancelled` when the caller's cancel
//! future completes. Neither of the last two says anything about whether the
//! transaction will still land.

use super::NodeApi;
use crate::error::{ClientError, ClientResult};
use crate::types::TransactionResult;

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Stand-in deadline for timeouts too large to represent as an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Poll `hash` every `poll_interval` until it is terminal, `timeout` elapses
/// or `cancel` completes.
///
/// Up to `max_poll_failures` consecutive transient errors are tolerated;
/// one more surfaces as `ClientError::Network`. A failed poll never marks
/// the transaction as failed.
pub async fn wait_for_transaction_until<N, C>(
    node: &N,
    hash: &str,
    timeout: Duration,
    poll_interval: Duration,
    max_poll_failures: u32,
    cancel: C,
) -> ClientResult<TransactionResult>
where
    N: NodeApi + ?Sized,
    C: Future<Output = ()>,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE);

    let poll = poll_until_terminal(node, hash, deadline, poll_interval, max_poll_failures);

    // Both futures are dropped on return, which releases any in-flight
    // request and the poll timer
    let result = tokio::select! {
        biased;
        _ = cancel => {
            info!("Wait for transaction {} cancelled", hash);
            Err(ClientError::Cancelled { hash: hash.to_string() })
        }
        result = poll => result,
    };

    crate::metrics::record_wait_outcome(&result, started.elapsed());
    result
}

async fn poll_until_terminal<N>(
    node: &N,
    hash: &str,
    deadline: Instant,
    poll_interval: Duration,
    max_poll_failures: u32,
) -> ClientResult<TransactionResult>
where
    N: NodeApi + ?Sized,
{
    let mut consecutive_failures = 0u32;
    let mut attempt = 0u32;

    loop {
        if Instant::now() >= deadline {
            warn!("Timed out waiting for transaction {} after {} polls", hash, attempt);
            return Err(ClientError::TimedOut {
                hash: hash.to_string(),
            });
        }

        attempt += 1;
        crate::metrics::record_poll();

        match timeout_at(deadline, node.get_transaction_by_hash(hash)).await {
            Err(_) => {
                warn!("Timed out waiting for transaction {} during poll {}", hash, attempt);
                return Err(ClientError::TimedOut {
                    hash: hash.to_string(),
                });
            }
            Ok(Ok(result)) if result.is_terminal() => {
                info!(
                    "Transaction {} is {} after {} polls",
                    hash,
                    result.status.as_str(),
                    attempt
                );
                return Ok(result);
            }
            Ok(Ok(_)) => {
                consecutive_failures = 0;
                debug!("Transaction {} still pending (poll {})", hash, attempt);
            }
            Ok(Err(e)) if e.is_retryable() => {
                consecutive_failures += 1;
                if consecutive_failures > max_poll_failures {
                    return Err(ClientError::Network(format!(
                        "Polling transaction {} failed {} times in a row: {}",
                        hash, consecutive_failures, e
                    )));
                }
                warn!(
                    "Poll {} for transaction {} failed ({}/{}): {}",
                    attempt, hash, consecutive_failures, max_poll_failures, e
                );
            }
            Ok(Err(e)) => return Err(e),
        }

        let delay = next_poll_delay(poll_interval, consecutive_failures);
        let wake = Instant::now()
            .checked_add(delay)
            .map_or(deadline, |at| at.min(deadline));
        sleep_until(wake).await;
    }
}

/// Poll interval, doubled for each consecutive transient failure
fn next_poll_delay(poll_interval: Duration, consecutive_failures: u32) -> Duration {
    poll_interval.saturating_mul(2u32.saturating_pow(consecutive_failures))
}
