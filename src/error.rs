//! Error types for the entry-function submitter

use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    #[error("Invalid entry function identifier: {0}")]
    InvalidFunctionId(String),

    #[error("Invalid type argument: {0}")]
    InvalidTypeArgument(String),

    #[error("Argument {index} is not wire-encodable: {reason}")]
    InvalidArgumentEncoding { index: usize, reason: String },

    #[error("Invalid transaction hash: {0}")]
    InvalidTransactionHash(String),

    #[error("Signing failed: {0}")]
    SigningFailure(String),

    #[error("Sequence number {sequence_number} for {address} conflicts with on-chain state: {detail}")]
    SequenceNumberConflict {
        address: String,
        sequence_number: u64,
        detail: String,
    },

    #[error("Submission rejected by node (HTTP {status_code}): {detail}")]
    SubmissionRejected { status_code: u16, detail: String },

    #[error("Node returned HTTP {status_code}: {body}")]
    Node { status_code: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction {hash} failed on chain: {detail}")]
    TransactionFailed { hash: String, detail: String },

    #[error("Timed out waiting for transaction {hash}")]
    TimedOut { hash: String },

    #[error("Wait for transaction {hash} was cancelled")]
    Cancelled { hash: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Node { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// The transaction may or may not have landed; the caller has to re-query
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            ClientError::TimedOut { .. } | ClientError::Cancelled { .. }
        )
    }

    /// Check if error was caused by local input rather than the node
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidAddress(_)
                | ClientError::InvalidFunctionId(_)
                | ClientError::InvalidTypeArgument(_)
                | ClientError::InvalidArgumentEncoding { .. }
                | ClientError::InvalidTransactionHash(_)
                | ClientError::SigningFailure(_)
                | ClientError::Config(_)
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ClientError::Node {
                status_code: status.as_u16(),
                body: e.to_string(),
            },
            None => ClientError::Network(e.to_string()),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
