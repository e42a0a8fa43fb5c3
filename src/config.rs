//! Configuration management for the submitter
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub node: NodeConfig,
    #[serde(default)]
    pub submitter: SubmitterConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Well-known public networks
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    pub fn node_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.aptoslabs.com/v1",
            Network::Testnet => "https://fullnode.testnet.aptoslabs.com/v1",
            Network::Devnet => "https://fullnode.devnet.aptoslabs.com/v1",
            Network::Local => "http://127.0.0.1:8080/v1",
        }
    }

    /// Mainnet has no faucet
    pub fn faucet_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => None,
            Network::Testnet => Some("https://faucet.testnet.aptoslabs.com"),
            Network::Devnet => Some("https://faucet.devnet.aptoslabs.com"),
            Network::Local => Some("http://127.0.0.1:8081"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Fills `url`/`faucet_url` when they are unset
    pub network: Option<Network>,
    #[serde(default)]
    pub url: String,
    pub faucet_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NodeConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network: Some(network),
            url: network.node_url().to_string(),
            faucet_url: network.faucet_url().map(str::to_string),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterConfig {
    #[serde(default = "default_max_gas_amount")]
    pub max_gas_amount: u64,
    /// Fixed gas price; the node's estimate is used when absent
    pub gas_unit_price: Option<u64>,
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            max_gas_amount: default_max_gas_amount(),
            gas_unit_price: None,
            expiration_secs: default_expiration_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl PollingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_gas_amount() -> u64 {
    2_000
}

fn default_expiration_secs() -> u64 {
    600
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_private_key_env() -> String {
    "SUBMITTER_PRIVATE_KEY".to_string()
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> Result<Self> {
        let config_path = env::var("ENTRY_SUBMITTER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text
    pub fn from_toml(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let mut settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.apply_network();
        settings.validate()?;

        Ok(settings)
    }

    /// Settings for a public network with all other values defaulted
    pub fn for_network(network: Network) -> Self {
        Self {
            node: NodeConfig::for_network(network),
            submitter: SubmitterConfig::default(),
            polling: PollingConfig::default(),
            wallet: WalletConfig::default(),
        }
    }

    fn apply_network(&mut self) {
        if let Some(network) = self.node.network {
            if self.node.url.is_empty() {
                self.node.url = network.node_url().to_string();
            }
            if self.node.faucet_url.is_none() {
                self.node.faucet_url = network.faucet_url().map(str::to_string);
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.node.url.is_empty() {
            anyhow::bail!("node.url or node.network must be set");
        }
        if !self.node.url.starts_with("http://") && !self.node.url.starts_with("https://") {
            anyhow::bail!("node.url must be an http(s) URL: {}", self.node.url);
        }
        if self.polling.poll_interval_ms == 0 {
            anyhow::bail!("polling.poll_interval_ms must be positive");
        }
        if self.submitter.max_gas_amount == 0 {
            anyhow::bail!("submitter.max_gas_amount must be positive");
        }
        if self.node.network == Some(Network::Mainnet) && self.node.faucet_url.is_some() {
            tracing::warn!("Faucet URL configured for mainnet - it will not be used");
        }

        Ok(())
    }
}

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Replace `${VAR_NAME}` with the variable's value; unset variables become empty
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
