//! REST client for the node's v1 HTTP API

use super::confirm::wait_for_transaction_until;
use super::NodeApi;
use crate::account::AccountAddress;
use crate::config::{NodeConfig, PollingConfig};
use crate::error::{ClientError, ClientResult};
use crate::types::{
    AccountResource, AccountView, SignedTransaction, TransactionResult, TransactionView,
    UnsignedTransaction,
};

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resource holding the native coin balance
pub const APTOS_COIN_STORE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

/// Node error codes that mean the sequence number was already used
const SEQUENCE_CONFLICT_CODES: &[&str] = &["sequence_number_too_old", "invalid_transaction_update"];

/// JSON error body returned by the node on non-success responses
#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    message: String,
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GasEstimation {
    gas_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct PendingTransactionView {
    hash: String,
}

/// HTTP client bound to one node endpoint
#[derive(Clone)]
pub struct RestClient {
    /// Base URL without trailing slash, e.g. `https://node/v1`
    base_url: String,
    http: reqwest::Client,
    /// Retries for idempotent requests and tolerated poll failures
    max_retries: u32,
    /// First backoff delay, doubled on each retry
    retry_delay: Duration,
}

impl RestClient {
    /// Create a client with default timeouts and retry policy
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::build(
            base_url.into(),
            Duration::from_secs(10),
            PollingConfig::default(),
        )
    }

    /// Create a client from configuration
    pub fn from_config(node: &NodeConfig, polling: &PollingConfig) -> ClientResult<Self> {
        Self::build(node.url.clone(), node.request_timeout(), polling.clone())
    }

    fn build(base_url: String, request_timeout: Duration, polling: PollingConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            max_retries: polling.max_retries,
            retry_delay: polling.retry_delay(),
        })
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a resource stored under an account
    pub async fn get_account_resource(
        &self,
        address: AccountAddress,
        resource_type: &str,
    ) -> ClientResult<AccountResource> {
        let path = format!("/accounts/{}/resource/{}", address, resource_type);
        let path = path.as_str();
        self.with_retry("get_account_resource", || self.get_json(path))
            .await
    }

    /// Native coin balance of an account
    pub async fn get_account_balance(&self, address: AccountAddress) -> ClientResult<u64> {
        let resource = self.get_account_resource(address, APTOS_COIN_STORE).await?;
        resource.data["coin"]["value"]
            .as_str()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ClientError::Node {
                status_code: StatusCode::OK.as_u16(),
                body: format!("Unexpected coin store shape: {}", resource.data),
            })
    }

    /// Poll until the transaction is committed or failed
    pub async fn wait_for_transaction(
        &self,
        hash: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ClientResult<TransactionResult> {
        self.wait_for_transaction_until(hash, timeout, poll_interval, std::future::pending())
            .await
    }

    /// Like [`RestClient::wait_for_transaction`], but also stops when `cancel` completes
    pub async fn wait_for_transaction_until<C>(
        &self,
        hash: &str,
        timeout: Duration,
        poll_interval: Duration,
        cancel: C,
    ) -> ClientResult<TransactionResult>
    where
        C: Future<Output = ()>,
    {
        wait_for_transaction_until(self, hash, timeout, poll_interval, self.max_retries, cancel).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        debug!("GET {}", path);
        let response = self.http.get(self.url(path)).send().await?;
        let response = check_status(response).await?;
        decode(response).await
    }

    /// Retry idempotent requests on transient failures with exponential backoff
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut request: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match request().await {
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    let delay = self.retry_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        operation,
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    crate::metrics::record_request_retry(operation);
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl NodeApi for RestClient {
    async fn get_sequence_number(&self, address: AccountAddress) -> ClientResult<u64> {
        let path = format!("/accounts/{}", address);
        let path = path.as_str();
        let account: AccountView = self
            .with_retry("get_account", || self.get_json(path))
            .await?;
        Ok(account.sequence_number)
    }

    async fn estimate_gas_price(&self) -> ClientResult<u64> {
        let estimation: GasEstimation = self
            .with_retry("estimate_gas_price", || self.get_json("/estimate_gas_price"))
            .await?;
        Ok(estimation.gas_estimate)
    }

    async fn encode_submission(&self, txn: &UnsignedTransaction) -> ClientResult<Vec<u8>> {
        // Encoding is a pure function on the node, so it is safe to retry
        let encoded: String = self
            .with_retry("encode_submission", move || async move {
                let response = self
                    .http
                    .post(self.url("/transactions/encode_submission"))
                    .json(txn)
                    .send()
                    .await?;
                let response = check_status(response).await?;
                decode(response).await
            })
            .await?;

        hex::decode(encoded.trim_start_matches("0x")).map_err(|e| ClientError::Node {
            status_code: StatusCode::OK.as_u16(),
            body: format!("Signing message is not hex: {}", e),
        })
    }

    async fn submit_signed_transaction(&self, txn: &SignedTransaction) -> ClientResult<String> {
        let body = txn.to_submission_bytes()?;

        // Submissions are sent once; the caller decides whether to resubmit
        let response = self
            .http
            .post(self.url("/transactions"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_rejection(status, &text, txn));
        }

        let response = check_status(response).await?;
        let pending: PendingTransactionView = decode(response).await?;
        info!(
            "Submitted transaction {} from {} (sequence {})",
            pending.hash,
            txn.raw().sender,
            txn.raw().sequence_number
        );
        Ok(pending.hash)
    }

    async fn get_transaction_by_hash(&self, hash: &str) -> ClientResult<TransactionResult> {
        validate_hash(hash)?;
        let path = format!("/transactions/by_hash/{}", hash);
        debug!("GET {}", path);
        let response = self.http.get(self.url(&path)).send().await?;

        // Not yet indexed: the node has not seen it or is still processing it
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(TransactionResult::pending(hash));
        }

        let response = check_status(response).await?;
        let view: TransactionView = decode(response).await?;
        Ok(view.into())
    }
}

/// Hashes go into the URL path, so only `0x`-prefixed hex of at most 32 bytes is accepted
fn validate_hash(hash: &str) -> ClientResult<()> {
    let digits = hash
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::InvalidTransactionHash(hash.to_string()))?;
    if digits.is_empty() || digits.len() > 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ClientError::InvalidTransactionHash(hash.to_string()));
    }
    Ok(())
}

/// Turn non-success responses into `ClientError::Node`
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Node {
        status_code: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

fn classify_rejection(status: StatusCode, body: &str, txn: &SignedTransaction) -> ClientError {
    let parsed: Option<NodeErrorBody> = serde_json::from_str(body).ok();

    let (detail, error_code) = match parsed {
        Some(err) => (err.message, err.error_code),
        None => (body.to_string(), None),
    };

    let is_conflict = error_code
        .as_deref()
        .map(|code| SEQUENCE_CONFLICT_CODES.contains(&code))
        .unwrap_or(false)
        || detail.contains("SEQUENCE_NUMBER_TOO_OLD");

    if is_conflict {
        warn!(
            "Sequence number {} for {} rejected: {}",
            txn.raw().sequence_number,
            txn.raw().sender,
            detail
        );
        crate::metrics::record_rejection("sequence_conflict");
        ClientError::SequenceNumberConflict {
            address: txn.raw().sender.to_string(),
            sequence_number: txn.raw().sequence_number,
            detail,
        }
    } else {
        warn!("Submission rejected with HTTP {}: {}", status.as_u16(), detail);
        crate::metrics::record_rejection("rejected");
        ClientError::SubmissionRejected {
            status_code: status.as_u16(),
            detail,
        }
    }
}
