//! entry-submitter - submit entry-function transactions and wait for them
//!
//! Reads node settings from a TOML config (or a network preset), signs with
//! the private key found in the configured environment variable, and prints
//! the resulting transaction status.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use entry_submitter::{
    payload::build_entry_function_by_id, Account, AccountAddress, EntryFunctionId, FaucetClient,
    Network, NodeApi, RestClient, Settings, SubmitOptions, TransactionStatus,
    TransactionSubmitter,
};

#[derive(Parser)]
#[command(name = "entry-submitter", version, about)]
struct Cli {
    /// Config file; defaults to $ENTRY_SUBMITTER_CONFIG or config/default.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a public network preset instead of a config file
    #[arg(long, global = true, value_enum)]
    network: Option<Network>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit an entry function call
    Submit {
        /// Fully-qualified function, e.g. 0x1::aptos_account::transfer
        #[arg(long)]
        function: String,

        /// Type argument, repeatable
        #[arg(long = "type-arg")]
        type_args: Vec<String>,

        /// Argument, repeatable. Arrays and booleans are parsed as JSON,
        /// everything else is passed as a string.
        #[arg(long = "arg")]
        args: Vec<String>,

        #[arg(long)]
        gas_unit_price: Option<u64>,

        #[arg(long)]
        max_gas_amount: Option<u64>,

        /// Return after submission instead of waiting for confirmation
        #[arg(long)]
        no_wait: bool,
    },
    /// Fund an address from the network faucet
    Fund {
        /// Defaults to the configured account
        #[arg(long)]
        address: Option<AccountAddress>,

        #[arg(long)]
        amount: u64,
    },
    /// Print the on-chain sequence number of an address
    Sequence {
        #[arg(long)]
        address: AccountAddress,
    },
    /// Print the status of a transaction
    Status {
        hash: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.json_logs);

    let settings = match (cli.network, &cli.config) {
        (Some(network), _) => Settings::for_network(network),
        (None, Some(path)) => Settings::load_from(path)?,
        (None, None) => Settings::load()?,
    };
    info!("Using node {}", settings.node.url);

    let rest = Arc::new(RestClient::from_config(&settings.node, &settings.polling)?);

    let result = run(cli.command, &settings, rest).await;

    if cli.metrics {
        println!("{}", entry_submitter::metrics::render());
    }

    result
}

async fn run(command: Command, settings: &Settings, rest: Arc<RestClient>) -> Result<()> {
    match command {
        Command::Submit {
            function,
            type_args,
            args,
            gas_unit_price,
            max_gas_amount,
            no_wait,
        } => {
            let account = load_account(settings)?;
            let function: EntryFunctionId = function.parse()?;
            let payload = build_entry_function_by_id(
                function,
                type_args,
                args.iter().map(|a| parse_cli_argument(a)),
            )?;

            let options = SubmitOptions {
                gas_unit_price,
                max_gas_amount,
                expiration: None,
            };

            let submitter = TransactionSubmitter::new(
                rest.clone(),
                &settings.submitter,
                settings.polling.clone(),
            );

            let pending = submitter
                .submit_with_refetch(&account, payload, &options)
                .await
                .context("Submission failed")?;
            println!("{}", pending.hash);

            if no_wait {
                return Ok(());
            }

            let result = submitter.wait(&pending.hash).await?;
            match result.status {
                TransactionStatus::Committed => {
                    info!("Transaction {} committed at version {:?}", result.hash, result.version);
                }
                _ => {
                    warn!(
                        "Transaction {} failed: {}",
                        result.hash,
                        result.error_detail.as_deref().unwrap_or("unknown")
                    );
                }
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Fund { address, amount } => {
            let faucet_url = settings
                .node
                .faucet_url
                .clone()
                .context("No faucet configured for this network")?;
            let address = match address {
                Some(address) => address,
                None => load_account(settings)?.address(),
            };

            FaucetClient::new(faucet_url, rest, settings.polling.clone())
                .fund(address, amount)
                .await?;
            println!("Funded {} with {}", address, amount);
        }
        Command::Sequence { address } => {
            let sequence = rest.get_sequence_number(address).await?;
            println!("{}", sequence);
        }
        Command::Status { hash } => {
            let result = rest.get_transaction_by_hash(&hash).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn load_account(settings: &Settings) -> Result<Account> {
    let env_name = &settings.wallet.private_key_env;
    let key = std::env::var(env_name)
        .with_context(|| format!("Set {} to the account's hex private key", env_name))?;
    let account = Account::from_hex(&key)?;
    info!("Loaded account {}", account.address());
    Ok(account)
}

/// Arrays and booleans are taken as JSON; anything else is a string argument
fn parse_cli_argument(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed == "true" || trimmed == "false" {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,entry_submitter=debug,hyper=warn,reqwest=warn")
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
