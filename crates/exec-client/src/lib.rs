//! Chain client abstraction for the execution engine.
//!
//! The executor never talks to a node directly. It goes through two seams:
//! [`ChainClient`], the account-level RPC capability (gas price, nonce,
//! transaction lookup, estimation, broadcast), and [`TransactionMethod`], one
//! prepared contract call that can be estimated and sent. Sending is two-stage:
//! awaiting [`TransactionMethod::send`] yields once the transaction has a hash,
//! and awaiting [`PendingTransaction::receipt`] yields once it is mined.

use async_trait::async_trait;
use exec_types::{
	Address, BlockTag, Bytes, CallRequest, Transaction, TransactionOptions, TransactionReceipt,
	TxHash, Wei,
};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use thiserror::Error;

pub mod erc20;
pub mod method;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

pub use erc20::Erc20;
pub use method::ContractCall;

/// Errors that can occur while talking to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
	/// Transport or RPC failure.
	#[error("Network error: {0}")]
	Network(String),
	/// The node or signer refused the call, including reverts during estimation.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// A transaction or receipt the caller asked for does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Malformed input such as an unparsable address or an out-of-range value.
	#[error("Invalid input: {0}")]
	InvalidInput(String),
}

/// Account-level RPC capability used by the executor.
///
/// Implementations are shared across concurrent executions, so every method
/// takes `&self`.
#[async_trait]
pub trait ChainClient: Send + Sync {
	fn chain_id(&self) -> u64;

	/// Account used when a request carries no `from`.
	fn default_sender(&self) -> Option<Address>;

	async fn get_gas_price(&self) -> Result<Wei, ClientError>;

	/// Transaction count of `address`; with [`BlockTag::Pending`] this is the
	/// next usable nonce even while earlier transactions are unmined.
	async fn get_transaction_count(&self, address: Address, tag: BlockTag)
		-> Result<u64, ClientError>;

	async fn get_transaction(&self, hash: TxHash) -> Result<Transaction, ClientError>;

	async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ClientError>;

	/// Broadcasts a transaction. Resolves once the transaction has a hash.
	async fn send_transaction(&self, request: CallRequest)
		-> Result<PendingTransaction, ClientError>;

	/// Read-only call against the latest state.
	async fn call(&self, request: &CallRequest) -> Result<Bytes, ClientError>;
}

/// One prepared contract call.
#[async_trait]
pub trait TransactionMethod: Send + Sync {
	async fn estimate_gas(&self, options: &TransactionOptions) -> Result<u64, ClientError>;

	async fn send(&self, options: TransactionOptions) -> Result<PendingTransaction, ClientError>;
}

/// A broadcast transaction waiting to be mined.
pub struct PendingTransaction {
	hash: TxHash,
	receipt: BoxFuture<'static, Result<TransactionReceipt, ClientError>>,
}

impl PendingTransaction {
	pub fn new<F>(hash: TxHash, receipt: F) -> Self
	where
		F: Future<Output = Result<TransactionReceipt, ClientError>> + Send + 'static,
	{
		Self {
			hash,
			receipt: Box::pin(receipt),
		}
	}

	pub fn hash(&self) -> TxHash {
		self.hash
	}

	/// Waits until the transaction is mined. No timeout is applied.
	pub async fn receipt(self) -> Result<TransactionReceipt, ClientError> {
		self.receipt.await
	}
}

impl fmt::Debug for PendingTransaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingTransaction")
			.field("hash", &self.hash)
			.finish_non_exhaustive()
	}
}
