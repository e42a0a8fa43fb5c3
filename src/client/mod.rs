//! Node client module
//!
//! This module provides:
//! - The `NodeApi` seam the submitter talks to
//! - A REST implementation against the node's v1 HTTP API
//! - Cancellable confirmation polling
//! - The test-network faucet collaborator

pub mod confirm;
pub mod faucet;
pub mod rest;

pub use confirm::wait_for_transaction_until;
pub use faucet::FaucetClient;
pub use rest::RestClient;

use crate::account::AccountAddress;
use crate::error::ClientResult;
use crate::types::{SignedTransaction, TransactionResult, UnsignedTransaction};

use async_trait::async_trait;

/// Operations the submitter needs from a node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Current on-chain sequence number of an account
    async fn get_sequence_number(&self, address: AccountAddress) -> ClientResult<u64>;

    /// Node-suggested gas unit price
    async fn estimate_gas_price(&self) -> ClientResult<u64>;

    /// Canonical signing message for an unsigned transaction
    async fn encode_submission(&self, txn: &UnsignedTransaction) -> ClientResult<Vec<u8>>;

    /// Submit a signed transaction and return its hash
    async fn submit_signed_transaction(&self, txn: &SignedTransaction) -> ClientResult<String>;

    /// Single status query; unknown hashes are reported as pending
    async fn get_transaction_by_hash(&self, hash: &str) -> ClientResult<TransactionResult>;
}
