//! Test-network faucet client

use super::RestClient;
use crate::account::AccountAddress;
use crate::config::PollingConfig;
use crate::error::{ClientError, ClientResult};
use crate::types::TransactionStatus;

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

/// Funds accounts on networks that run a faucet
pub struct FaucetClient {
    faucet_url: String,
    http: reqwest::Client,
    rest: Arc<RestClient>,
    polling: PollingConfig,
}

impl FaucetClient {
    pub fn new(faucet_url: impl Into<String>, rest: Arc<RestClient>, polling: PollingConfig) -> Self {
        Self {
            faucet_url: faucet_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            rest,
            polling,
        }
    }

    /// Mint `amount` to `address` and wait until the funding transactions commit
    pub async fn fund(&self, address: AccountAddress, amount: u64) -> ClientResult<()> {
        let response = self
            .http
            .post(format!("{}/mint", self.faucet_url))
            .query(&[
                ("amount", amount.to_string()),
                ("address", address.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Node {
                status_code: status.as_u16(),
                body,
            });
        }

        let hashes: Vec<String> = serde_json::from_str(&body)?;
        info!(
            "Faucet minted {} to {} in {} transaction(s)",
            amount,
            address,
            hashes.len()
        );

        let results = try_join_all(hashes.iter().map(|hash| {
            self.rest
                .wait_for_transaction(hash, self.polling.timeout(), self.polling.poll_interval())
        }))
        .await?;

        match results.into_iter().find(|r| r.status == TransactionStatus::Failed) {
            Some(failed) => Err(ClientError::TransactionFailed {
                hash: failed.hash,
                detail: failed.error_detail.unwrap_or_default(),
            }),
            None => Ok(()),
        }
    }
}
