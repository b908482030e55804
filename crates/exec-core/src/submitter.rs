//! Single-transaction submission.
//!
//! A submission moves through `Submitted(hash)` to `Mined` or `Reverted`.
//! The hash event always precedes the receipt event, and no event is emitted
//! for a transaction the client failed to broadcast.

use crate::error::ExecutionError;
use crate::events::{EventEmitter, ExecutionEvent};
use dashmap::DashMap;
use exec_client::{ChainClient, ClientError, TransactionMethod};
use exec_types::{truncate_id, SubmittedTransaction, Transaction, TransactionOptions, TxHash};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Transactions fetched by hash, at most one chain call per hash.
///
/// Concurrent lookups of the same hash share one call; a failed lookup is not
/// remembered and the next caller retries.
pub struct TransactionCache {
	client: Arc<dyn ChainClient>,
	entries: DashMap<TxHash, Arc<OnceCell<Transaction>>>,
}

impl TransactionCache {
	pub fn new(client: Arc<dyn ChainClient>) -> Self {
		Self {
			client,
			entries: DashMap::new(),
		}
	}

	pub async fn get(&self, hash: TxHash) -> Result<Transaction, ClientError> {
		let cell = self.entries.entry(hash).or_default().clone();
		cell.get_or_try_init(|| self.client.get_transaction(hash))
			.await
			.cloned()
	}

	pub fn len(&self) -> usize {
		self.entries.iter().filter(|entry| entry.value().initialized()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Sends one transaction and waits for it to be mined.
pub struct Submitter {
	transactions: TransactionCache,
}

impl Submitter {
	pub fn new(client: Arc<dyn ChainClient>) -> Self {
		Self {
			transactions: TransactionCache::new(client),
		}
	}

	pub fn transactions(&self) -> &TransactionCache {
		&self.transactions
	}

	/// Sends `method` with `options` and resolves once it is mined.
	///
	/// A reverted transaction still resolves; its receipt has `status: false`.
	#[instrument(skip_all, fields(suffix = %suffix, nonce = ?options.nonce))]
	pub async fn submit<T>(
		&self,
		method: &dyn TransactionMethod,
		options: TransactionOptions,
		suffix: &str,
		index: usize,
		events: &EventEmitter<T>,
	) -> Result<SubmittedTransaction, ExecutionError> {
		let pending = method.send(options).await.map_err(|source| {
			tracing::warn!(error = %source, "Failed to submit transaction");
			ExecutionError::Submission {
				suffix: suffix.to_string(),
				source,
			}
		})?;

		let hash = pending.hash();
		events.emit(ExecutionEvent::TransactionHash {
			index,
			suffix: suffix.to_string(),
			hash,
		});

		let receipt_error = |source: ClientError| {
			tracing::warn!(tx_hash = %hash, error = %source, "Failed to get receipt");
			ExecutionError::Receipt {
				suffix: suffix.to_string(),
				source,
			}
		};
		let receipt = pending.receipt().await.map_err(receipt_error)?;
		let transaction = self.transactions.get(hash).await.map_err(receipt_error)?;

		tracing::info!(
			tx_hash = %truncate_id(&hash.to_string()),
			block = receipt.block_number,
			gas_used = receipt.gas_used,
			status = receipt.status,
			"Transaction mined"
		);

		events.emit(ExecutionEvent::Receipt {
			index,
			suffix: suffix.to_string(),
			transaction: transaction.clone(),
			receipt: receipt.clone(),
		});

		Ok(SubmittedTransaction {
			transaction,
			receipt,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use exec_client::implementations::mock::{MockCall, MockChainClient};
	use exec_client::ContractCall;
	use exec_types::{Address, Bytes};

	#[tokio::test]
	async fn test_lookup_is_memoized() {
		let target = Address::repeat_byte(5);
		let mock = Arc::new(MockChainClient::new());
		let call = ContractCall::new(mock.clone(), target, Bytes::new());
		let hash = call
			.send(TransactionOptions::default())
			.await
			.unwrap()
			.hash();

		let cache = TransactionCache::new(mock.clone());
		let (first, second) = tokio::join!(cache.get(hash), cache.get(hash));
		assert_eq!(first.unwrap(), second.unwrap());
		cache.get(hash).await.unwrap();

		assert_eq!(mock.count(|c| matches!(c, MockCall::GetTransaction(_))), 1);
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_lookup_is_retried() {
		let mock = Arc::new(MockChainClient::new());
		let cache = TransactionCache::new(mock.clone());
		let hash = TxHash::repeat_byte(9);

		assert!(matches!(cache.get(hash).await, Err(ClientError::NotFound(_))));
		assert!(cache.get(hash).await.is_err());
		assert_eq!(mock.count(|c| matches!(c, MockCall::GetTransaction(_))), 2);
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn test_hash_precedes_receipt() {
		let target = Address::repeat_byte(5);
		let mock = Arc::new(MockChainClient::new().with_gas_used(target, 30_000));
		let submitter = Submitter::new(mock.clone());
		let call = ContractCall::new(mock, target, Bytes::new());
		let (events, mut receiver) = EventEmitter::<()>::channel();

		let options = TransactionOptions {
			gas: Some(40_000),
			nonce: Some(3),
			..Default::default()
		};
		let submitted = submitter
			.submit(&call, options, "claim", 0, &events)
			.await
			.unwrap();
		assert_eq!(submitted.transaction.nonce, 3);
		assert_eq!(submitted.receipt.gas_used, 30_000);

		let first = receiver.try_recv().unwrap();
		let second = receiver.try_recv().unwrap();
		assert_eq!(first.name(), "transactionHash-claim");
		assert_eq!(second.name(), "receipt-claim");
		assert!(receiver.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_send_failure_emits_nothing() {
		let target = Address::repeat_byte(5);
		let mock = Arc::new(
			MockChainClient::new()
				.fail_send(target, ClientError::Rejected("user denied".to_string())),
		);
		let submitter = Submitter::new(mock.clone());
		let call = ContractCall::new(mock, target, Bytes::new());
		let (events, mut receiver) = EventEmitter::<()>::channel();

		let err = submitter
			.submit(&call, TransactionOptions::default(), "claim", 0, &events)
			.await
			.unwrap_err();
		assert!(matches!(err, ExecutionError::Submission { .. }));
		assert!(receiver.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_receipt_failure_after_hash() {
		let target = Address::repeat_byte(5);
		let mock = Arc::new(
			MockChainClient::new()
				.fail_receipt(target, ClientError::Network("connection reset".to_string())),
		);
		let submitter = Submitter::new(mock.clone());
		let call = ContractCall::new(mock, target, Bytes::new());
		let (events, mut receiver) = EventEmitter::<()>::channel();

		let err = submitter
			.submit(&call, TransactionOptions::default(), "claim", 0, &events)
			.await
			.unwrap_err();
		assert_eq!(err.suffix(), Some("claim"));
		assert!(matches!(err, ExecutionError::Receipt { .. }));
		assert_eq!(receiver.try_recv().unwrap().name(), "transactionHash-claim");
		assert!(receiver.try_recv().is_err());
	}
}
