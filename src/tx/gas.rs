//! Gas parameters and expiration for new transactions

use crate::client::NodeApi;
use crate::config::SubmitterConfig;
use crate::error::{ClientError, ClientResult};

use chrono::Utc;
use std::time::Duration;
use tracing::debug;

/// When a transaction stops being valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Relative to the moment the transaction is built
    After(Duration),
    /// Absolute unix timestamp in seconds
    At(u64),
}

/// Per-submission overrides; unset fields fall back to configured defaults
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub gas_unit_price: Option<u64>,
    pub max_gas_amount: Option<u64>,
    pub expiration: Option<Expiration>,
}

impl SubmitOptions {
    pub fn gas_unit_price(mut self, price: u64) -> Self {
        self.gas_unit_price = Some(price);
        self
    }

    pub fn max_gas_amount(mut self, amount: u64) -> Self {
        self.max_gas_amount = Some(amount);
        self
    }

    pub fn expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

/// Resolved gas fields of an unsigned transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
}

impl GasParams {
    /// Upper bound on the fee, in octas
    pub fn max_fee(&self) -> u128 {
        self.max_gas_amount as u128 * self.gas_unit_price as u128
    }
}

/// Fills in gas price, gas limit and expiration
pub struct GasEstimator {
    default_max_gas_amount: u64,
    /// Fixed price from configuration, bypasses the node estimate
    fixed_gas_unit_price: Option<u64>,
    expiration_horizon: Duration,
}

impl GasEstimator {
    pub fn new(config: &SubmitterConfig) -> Self {
        Self {
            default_max_gas_amount: config.max_gas_amount,
            fixed_gas_unit_price: config.gas_unit_price,
            expiration_horizon: Duration::from_secs(config.expiration_secs),
        }
    }

    /// Resolve the gas fields for one submission
    pub async fn resolve<N>(&self, node: &N, options: &SubmitOptions) -> ClientResult<GasParams>
    where
        N: NodeApi + ?Sized,
    {
        let gas_unit_price = match options.gas_unit_price.or(self.fixed_gas_unit_price) {
            Some(price) => price,
            None => node.estimate_gas_price().await?,
        };

        let max_gas_amount = options.max_gas_amount.unwrap_or(self.default_max_gas_amount);
        if max_gas_amount == 0 {
            return Err(ClientError::Config("max_gas_amount must be positive".to_string()));
        }

        let expiration_timestamp_secs = match options
            .expiration
            .unwrap_or(Expiration::After(self.expiration_horizon))
        {
            Expiration::After(horizon) => now_secs().saturating_add(horizon.as_secs()),
            Expiration::At(timestamp) => timestamp,
        };

        let params = GasParams {
            max_gas_amount,
            gas_unit_price,
            expiration_timestamp_secs,
        };
        debug!("Resolved gas parameters: {:?}", params);
        Ok(params)
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(&SubmitterConfig::default())
    }
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
