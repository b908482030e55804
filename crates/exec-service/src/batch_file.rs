//! Batch files for the command line runner.
//!
//! ```toml
//! [[transactions]]
//! suffix = "approve"
//! to = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! data = "0x095ea7b3..."
//!
//! [[transactions]]
//! suffix = "deploy"
//! data = "0x6080..."   # no `to`: deploys `data`
//! gas = 500000
//! ```

use exec_client::{ChainClient, ContractCall};
use exec_core::{ExecutionError, TransactionBatch, TransactionDescriptor};
use exec_types::{Address, Bytes, Wei};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchFileError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Invalid batch file: {0}")]
	Parse(String),
}

impl From<toml::de::Error> for BatchFileError {
	fn from(err: toml::de::Error) -> Self {
		BatchFileError::Parse(err.message().to_string())
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchFile {
	#[serde(default)]
	pub transactions: Vec<TransactionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEntry {
	pub suffix: String,
	/// Omitted for contract deployments.
	pub to: Option<Address>,
	#[serde(default)]
	pub data: Bytes,
	pub value: Option<Wei>,
	pub gas: Option<u64>,
}

impl BatchFile {
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BatchFileError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Binds every entry to `client` as a contract call.
	pub fn into_batch(self, client: Arc<dyn ChainClient>) -> Result<TransactionBatch, ExecutionError> {
		TransactionBatch::from_descriptors(self.transactions.into_iter().map(|entry| {
			let call = match entry.to {
				Some(to) => ContractCall::new(client.clone(), to, entry.data),
				None => ContractCall::deploy(client.clone(), entry.data),
			};
			let mut descriptor = TransactionDescriptor::new(call, entry.suffix);
			descriptor.gas = entry.gas;
			descriptor.value = entry.value;
			descriptor
		}))
	}
}

impl FromStr for BatchFile {
	type Err = BatchFileError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(toml::from_str(s)?)
	}
}
