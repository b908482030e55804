//! Command line runner for transaction batches.
//!
//! Loads the configuration and a batch file, executes the batch against the
//! configured chain, logs progress as it happens and prints the final result
//! as JSON on stdout.

use clap::Parser;
use exec_client::implementations::evm::alloy::create_client;
use exec_client::ChainClient;
use exec_config::Config;
use exec_core::{ExecutionError, ExecutionEvent, ExecutionSettings, Executor};
use exec_types::{truncate_id, Address, SubmittedTransaction, TransactionOptions};
use std::path::PathBuf;
use std::sync::Arc;

mod batch_file;

use batch_file::BatchFile;

/// Command-line arguments for the batch runner.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Path to the batch file
	#[arg(short, long)]
	batch: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Progress goes to stderr; stdout carries only the JSON result.
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		chain_id = config.network.chain_id,
		"Loaded configuration [{}]",
		args.config.display()
	);

	let client: Arc<dyn ChainClient> =
		Arc::new(create_client(&config.network, &config.account.private_key)?);
	let executor = Executor::new(client.clone(), ExecutionSettings::from(&config.execution))?;

	let batch_file = BatchFile::from_file(&args.batch).await?;
	tracing::info!(transactions = batch_file.transactions.len(), "Loaded batch");

	let batch = async move { batch_file.into_batch(client) };
	let mut execution = executor.execute(batch, created_contracts, TransactionOptions::default());

	while let Some(event) = execution.next_event().await {
		log_event(&event);
	}

	match execution.result().await {
		Ok(result) => {
			if let Some(receipt) = result.last_receipt().filter(|receipt| !receipt.status) {
				tracing::warn!(tx_hash = %receipt.hash, "Last transaction of the batch reverted");
			}
			println!("{}", serde_json::to_string_pretty(&result)?);
			Ok(())
		}
		Err(error) => Err(error.into()),
	}
}

/// Addresses of the contracts created by the batch, in order.
fn created_contracts(raw: &[SubmittedTransaction]) -> Result<Vec<Address>, ExecutionError> {
	Ok(raw
		.iter()
		.filter_map(|submitted| submitted.receipt.contract_address)
		.collect())
}

fn log_event(event: &ExecutionEvent<Vec<Address>>) {
	match event {
		ExecutionEvent::Transactions {
			expected_fee,
			suffixes,
		} => {
			tracing::info!(
				expected_fee = %expected_fee,
				expected_fee_eth = %expected_fee.format(18),
				"Running {} transaction(s): {}",
				suffixes.len(),
				suffixes.join(", ")
			);
		}
		ExecutionEvent::EstimatedGas { suffix, gas, .. } => {
			tracing::info!(suffix = %suffix, gas, "Estimated gas");
		}
		ExecutionEvent::TransactionHash { suffix, hash, .. } => {
			tracing::info!(suffix = %suffix, tx_hash = %hash, "Transaction sent");
		}
		ExecutionEvent::Receipt {
			suffix, receipt, ..
		} => {
			tracing::info!(
				suffix = %suffix,
				tx_hash = %truncate_id(&receipt.hash.to_string()),
				block = receipt.block_number,
				status = receipt.status,
				"Transaction mined"
			);
		}
		ExecutionEvent::Completed(result) => {
			tracing::info!(
				fees = %result.fees,
				fees_eth = %result.fees.format(18),
				"Batch completed"
			);
		}
		ExecutionEvent::Failed(error) => {
			tracing::warn!(suffix = ?error.suffix(), "Batch failed: {}", error.reason());
		}
	}
}
