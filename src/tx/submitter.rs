//! Transaction submitter: sequence, sign, submit

use super::gas::{GasEstimator, SubmitOptions};
use super::sequence::SequenceManager;
use crate::account::Account;
use crate::client::{wait_for_transaction_until, NodeApi};
use crate::config::{PollingConfig, SubmitterConfig};
use crate::error::{ClientError, ClientResult};
use crate::payload::TransactionPayload;
use crate::types::{Ed25519Authenticator, SignedTransaction, TransactionResult, UnsignedTransaction};

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds, signs and submits transactions for local accounts
pub struct TransactionSubmitter {
    /// Node access
    node: Arc<dyn NodeApi>,
    /// Per-sender sequence numbers, shareable between submitters
    sequences: Arc<SequenceManager>,
    /// Gas and expiration defaults
    gas: GasEstimator,
    /// Used by `wait` and `submit_and_wait`
    polling: PollingConfig,
}

impl TransactionSubmitter {
    /// Create a new transaction submitter
    pub fn new(node: Arc<dyn NodeApi>, config: &SubmitterConfig, polling: PollingConfig) -> Self {
        Self {
            node,
            sequences: Arc::new(SequenceManager::new()),
            gas: GasEstimator::new(config),
            polling,
        }
    }

    /// Share sequence tracking with other submitters in this process
    pub fn with_sequence_manager(mut self, sequences: Arc<SequenceManager>) -> Self {
        self.sequences = sequences;
        self
    }

    pub fn sequence_manager(&self) -> &Arc<SequenceManager> {
        &self.sequences
    }

    /// Submit a payload from `account`.
    ///
    /// Returns as soon as the node accepts the transaction; the result is
    /// always `Pending`. Use [`TransactionSubmitter::wait`] to confirm.
    pub async fn submit(
        &self,
        account: &Account,
        payload: TransactionPayload,
        options: &SubmitOptions,
    ) -> ClientResult<TransactionResult> {
        let sender = account.address();
        let gas = self.gas.resolve(self.node.as_ref(), options).await?;

        // Held until this function returns, on every path
        let mut lease = self.sequences.acquire(sender).await;

        let on_chain = self.node.get_sequence_number(sender).await?;
        let sequence_number = lease.allocate(on_chain);

        let raw = UnsignedTransaction {
            sender,
            sequence_number,
            max_gas_amount: gas.max_gas_amount,
            gas_unit_price: gas.gas_unit_price,
            expiration_timestamp_secs: gas.expiration_timestamp_secs,
            payload,
        };

        let signing_message = self.node.encode_submission(&raw).await?;
        if signing_message.is_empty() {
            return Err(ClientError::SigningFailure(
                "node returned an empty signing message".to_string(),
            ));
        }
        let signature = account.sign(&signing_message);
        debug!(
            "Signed {} byte message for {} (sequence {})",
            signing_message.len(),
            sender,
            sequence_number
        );

        let signed = SignedTransaction::new(
            raw,
            Ed25519Authenticator::new(&account.public_key(), &signature),
        );

        match self.node.submit_signed_transaction(&signed).await {
            Ok(hash) => {
                lease.mark_pending(sequence_number, &hash, gas.expiration_timestamp_secs);
                crate::metrics::record_tx_submitted();
                info!(
                    "Transaction {} submitted by {} with sequence {} (max fee {})",
                    hash,
                    sender,
                    sequence_number,
                    gas.max_fee()
                );
                Ok(TransactionResult::pending(hash))
            }
            Err(e @ ClientError::SequenceNumberConflict { .. }) => {
                lease.forget();
                Err(e)
            }
            // A rejected number above the chain means the local gap is not filling
            Err(e @ ClientError::SubmissionRejected { .. }) if sequence_number > on_chain => {
                lease.forget();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Submit, and on a sequence number conflict refetch and retry once
    pub async fn submit_with_refetch(
        &self,
        account: &Account,
        payload: TransactionPayload,
        options: &SubmitOptions,
    ) -> ClientResult<TransactionResult> {
        match self.submit(account, payload.clone(), options).await {
            Err(ClientError::SequenceNumberConflict {
                sequence_number, ..
            }) => {
                warn!(
                    "Sequence {} for {} was stale, refetching and retrying once",
                    sequence_number,
                    account.address()
                );
                self.submit(account, payload, options).await
            }
            result => result,
        }
    }

    /// Wait for a submitted transaction using the configured polling policy
    pub async fn wait(&self, hash: &str) -> ClientResult<TransactionResult> {
        self.wait_until(hash, std::future::pending()).await
    }

    /// Like [`TransactionSubmitter::wait`], stopping early when `cancel` completes
    pub async fn wait_until<C>(&self, hash: &str, cancel: C) -> ClientResult<TransactionResult>
    where
        C: Future<Output = ()>,
    {
        wait_for_transaction_until(
            self.node.as_ref(),
            hash,
            self.polling.timeout(),
            self.polling.poll_interval(),
            self.polling.max_retries,
            cancel,
        )
        .await
    }

    /// Submit and wait for a terminal status
    pub async fn submit_and_wait(
        &self,
        account: &Account,
        payload: TransactionPayload,
        options: &SubmitOptions,
    ) -> ClientResult<TransactionResult> {
        let pending = self.submit(account, payload, options).await?;
        self.wait(&pending.hash).await
    }
}
