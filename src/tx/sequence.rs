//! Sequence number management for reliable submission
//!
//! Handles:
//! - Serializing submissions from the same sender
//! - Local tracking of numbers handed out but not yet confirmed
//! - Resync with on-chain state after a conflict or an expired submission

use crate::account::AccountAddress;

use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// An accepted submission the chain has not executed yet
#[derive(Debug, Clone)]
struct PendingSubmission {
    hash: String,
    expiration_timestamp_secs: u64,
}

/// Per-sender sequence state
#[derive(Debug, Default)]
struct SenderState {
    /// Next number to hand out, if anything was submitted since the last resync
    next: Option<u64>,
    /// Accepted submissions not yet seen on chain, by sequence number
    pending: BTreeMap<u64, PendingSubmission>,
}

/// Manages sequence numbers across senders
#[derive(Default)]
pub struct SequenceManager {
    senders: DashMap<AccountAddress, Arc<Mutex<SenderState>>>,
}

impl SequenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the sender's lock; held until the lease is dropped
    pub async fn acquire(&self, sender: AccountAddress) -> SequenceLease {
        let state = self
            .senders
            .entry(sender)
            .or_insert_with(|| Arc::new(Mutex::new(SenderState::default())))
            .clone();

        SequenceLease {
            sender,
            state: state.lock_owned().await,
        }
    }

    /// Forget local state so the next submission uses the on-chain number
    pub async fn resync(&self, sender: AccountAddress) {
        let lease = self.acquire(sender).await;
        lease.forget();
    }

    /// Accepted submissions from `sender` that have not been confirmed yet
    pub async fn pending(&self, sender: AccountAddress) -> Vec<(u64, String)> {
        let Some(state) = self.senders.get(&sender).map(|s| s.clone()) else {
            return Vec::new();
        };
        let state = state.lock().await;
        state
            .pending
            .iter()
            .map(|(seq, submission)| (*seq, submission.hash.clone()))
            .collect()
    }
}

/// Exclusive access to one sender's sequence numbers
pub struct SequenceLease {
    sender: AccountAddress,
    state: OwnedMutexGuard<SenderState>,
}

impl SequenceLease {
    pub fn sender(&self) -> AccountAddress {
        self.sender
    }

    /// Pick the number for the next submission given the on-chain value
    pub fn allocate(&mut self, on_chain: u64) -> u64 {
        self.allocate_at(on_chain, Utc::now().timestamp().max(0) as u64)
    }

    fn allocate_at(&mut self, on_chain: u64, now_secs: u64) -> u64 {
        // Everything below the on-chain number has been executed
        self.state.pending = self.state.pending.split_off(&on_chain);

        // An expired submission will never execute, so nothing above it can either
        let expired = self
            .state
            .pending
            .iter()
            .find(|(_, p)| p.expiration_timestamp_secs < now_secs)
            .map(|(seq, p)| (*seq, p.hash.clone()));
        if let Some((seq, hash)) = expired {
            warn!(
                "Submission {} (sequence {}) from {} expired unexecuted, falling back to on-chain sequence {}",
                hash, seq, self.sender, on_chain
            );
            self.state.pending.clear();
            self.state.next = None;
        }

        let sequence_number = match self.state.next {
            Some(next) if next > on_chain => {
                debug!(
                    "Sender {} has {} unconfirmed submission(s), using local sequence {}",
                    self.sender,
                    next - on_chain,
                    next
                );
                next
            }
            _ => on_chain,
        };

        debug!("Allocated sequence {} for {}", sequence_number, self.sender);
        sequence_number
    }

    /// Record an accepted submission that is valid until `expiration_timestamp_secs`
    pub fn mark_pending(&mut self, sequence_number: u64, hash: &str, expiration_timestamp_secs: u64) {
        self.state.pending.insert(
            sequence_number,
            PendingSubmission {
                hash: hash.to_string(),
                expiration_timestamp_secs,
            },
        );
        self.state.next = Some(sequence_number + 1);
    }

    /// Drop local state so the next allocation uses the on-chain number
    pub fn forget(mut self) {
        if !self.state.pending.is_empty() {
            warn!(
                "Discarding {} unconfirmed submission(s) for {}",
                self.state.pending.len(),
                self.sender
            );
        }
        self.state.pending.clear();
        self.state.next = None;
    }
}
