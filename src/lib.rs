//! Entry-function transaction client
//!
//! Builds entry-function payloads, signs them with a local ed25519 account,
//! submits them to a node's REST API and waits for confirmation.
//!
//! ```no_run
//! use entry_submitter::{
//!     build_entry_function, payload::arg, Account, RestClient, SubmitOptions,
//!     SubmitterConfig, PollingConfig, TransactionSubmitter,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> entry_submitter::ClientResult<()> {
//! let node = Arc::new(RestClient::new("https://fullnode.testnet.aptoslabs.com/v1")?);
//! let submitter = TransactionSubmitter::new(node, &SubmitterConfig::default(), PollingConfig::default());
//!
//! let account = Account::from_hex("0x...")?;
//! let payload = build_entry_function("0x1::aptos_account", "transfer", Vec::<String>::new(), vec![
//!     arg::address(&account.address()),
//!     arg::u64(100),
//! ])?;
//!
//! let pending = submitter.submit(&account, payload, &SubmitOptions::default()).await?;
//! let result = submitter.wait(&pending.hash).await?;
//! println!("{} is {:?}", result.hash, result.status);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod tx;
pub mod types;

pub use account::{Account, AccountAddress};
pub use client::{FaucetClient, NodeApi, RestClient};
pub use config::{Network, PollingConfig, Settings, SubmitterConfig};
pub use error::{ClientError, ClientResult};
pub use payload::{build_entry_function, EntryFunctionId, TransactionPayload};
pub use tx::{Expiration, SubmitOptions, TransactionSubmitter};
pub use types::{SignedTransaction, TransactionResult, TransactionStatus, UnsignedTransaction};
