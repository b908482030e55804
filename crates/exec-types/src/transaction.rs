//! Transaction types for the execution engine.
//!
//! Requests flow from the executor to the chain client; transactions and
//! receipts flow back and end up in the [`ExecutionResult`] of a batch.

use crate::fees::Wei;
use alloy_primitives::{Address, Bytes, TxHash, B256};
use serde::{Deserialize, Serialize};

/// Block tag used for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
	Latest,
	/// Latest state plus transactions still in the pending pool.
	Pending,
}

/// What the runner does when a transaction is mined with `status: false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevertPolicy {
	/// Keep going; the revert shows up in the receipt and in `status`.
	#[default]
	Continue,
	/// Fail the batch at the first reverted transaction.
	Abort,
}

/// Per-transaction options handed to a transaction method.
///
/// Everything is optional at the caller level; the executor fills in `from`,
/// `nonce` and `gas_price` before a method is estimated or sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<Wei>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Wei>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
}

/// A call as seen by the chain client: target, calldata and options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
	/// Target contract; `None` deploys `data` as init code.
	pub to: Option<Address>,
	pub data: Bytes,
	#[serde(flatten)]
	pub options: TransactionOptions,
}

impl CallRequest {
	pub fn new(to: Option<Address>, data: Bytes, options: TransactionOptions) -> Self {
		Self { to, data, options }
	}
}

/// The chain's view of a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub hash: TxHash,
	pub from: Address,
	pub to: Option<Address>,
	pub nonce: u64,
	pub value: Wei,
	pub gas_limit: u64,
	/// Legacy gas price, when the transaction carries one.
	pub gas_price: Option<Wei>,
	pub input: Bytes,
	pub block_number: Option<u64>,
}

/// A log emitted by a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: TxHash,
	pub block_number: u64,
	/// `true` if the transaction executed, `false` if it was mined but reverted.
	pub status: bool,
	pub gas_used: u64,
	pub effective_gas_price: Option<Wei>,
	/// Address of the contract created by a deployment.
	pub contract_address: Option<Address>,
	#[serde(default)]
	pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
	/// Logs emitted by `address` whose first topic is `topic0`.
	pub fn logs_matching(&self, address: Address, topic0: B256) -> impl Iterator<Item = &LogEntry> {
		self.logs.iter().filter(move |log| {
			log.address == address && log.topics.first() == Some(&topic0)
		})
	}
}

/// A transaction together with its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
	pub transaction: Transaction,
	pub receipt: TransactionReceipt,
}

impl SubmittedTransaction {
	/// Fee actually paid: gas price times gas used.
	///
	/// The transaction's own gas price is preferred, then the receipt's
	/// effective gas price, then `fallback`.
	pub fn fee(&self, fallback: Wei) -> Result<Wei, crate::ArithmeticError> {
		let gas_price = self
			.transaction
			.gas_price
			.or(self.receipt.effective_gas_price)
			.unwrap_or(fallback);
		gas_price.fee_for_gas(self.receipt.gas_used)
	}
}

/// Terminal value of a batch execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult<T> {
	/// Output of the caller's result parser.
	pub parsed: T,
	/// Total wei spent across every transaction of the batch.
	pub fees: Wei,
	/// Every submitted transaction, in submission order.
	pub raw: Vec<SubmittedTransaction>,
	/// Status of the last transaction; `true` for an empty batch.
	pub status: bool,
}

impl<T> ExecutionResult<T> {
	pub fn last_receipt(&self) -> Option<&TransactionReceipt> {
		self.raw.last().map(|submitted| &submitted.receipt)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256};

	fn receipt(gas_used: u64) -> TransactionReceipt {
		TransactionReceipt {
			hash: TxHash::ZERO,
			block_number: 1,
			status: true,
			gas_used,
			effective_gas_price: Some(Wei::from(7u64)),
			contract_address: None,
			logs: vec![],
		}
	}

	fn transaction(gas_price: Option<Wei>) -> Transaction {
		Transaction {
			hash: TxHash::ZERO,
			from: Address::ZERO,
			to: None,
			nonce: 0,
			value: Wei::ZERO,
			gas_limit: 100_000,
			gas_price,
			input: Bytes::new(),
			block_number: Some(1),
		}
	}

	#[test]
	fn test_fee_prefers_transaction_gas_price() {
		let submitted = SubmittedTransaction {
			transaction: transaction(Some(Wei::from(3u64))),
			receipt: receipt(10),
		};
		assert_eq!(submitted.fee(Wei::from(100u64)).unwrap(), Wei::from(30u64));

		let submitted = SubmittedTransaction {
			transaction: transaction(None),
			receipt: receipt(10),
		};
		assert_eq!(submitted.fee(Wei::from(100u64)).unwrap(), Wei::from(70u64));
	}

	#[test]
	fn test_logs_matching() {
		let emitter = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
		let topic = b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

		let mut receipt = receipt(21_000);
		receipt.logs = vec![
			LogEntry {
				address: emitter,
				topics: vec![topic],
				data: Bytes::new(),
			},
			LogEntry {
				address: Address::ZERO,
				topics: vec![topic],
				data: Bytes::new(),
			},
		];

		assert_eq!(receipt.logs_matching(emitter, topic).count(), 1);
		assert_eq!(receipt.logs_matching(emitter, B256::ZERO).count(), 0);
	}

	#[test]
	fn test_last_receipt() {
		let mut result = ExecutionResult {
			parsed: (),
			fees: Wei::ZERO,
			raw: vec![],
			status: true,
		};
		assert!(result.last_receipt().is_none());

		let mut reverted = receipt(50_000);
		reverted.status = false;
		result.raw = vec![
			SubmittedTransaction {
				transaction: transaction(None),
				receipt: receipt(21_000),
			},
			SubmittedTransaction {
				transaction: transaction(None),
				receipt: reverted,
			},
		];
		let last = result.last_receipt().unwrap();
		assert_eq!(last.gas_used, 50_000);
		assert!(!last.status);
	}

	#[test]
	fn test_revert_policy_names() {
		assert_eq!(RevertPolicy::default(), RevertPolicy::Continue);
		let policy: RevertPolicy = serde_json::from_str("\"abort\"").unwrap();
		assert_eq!(policy, RevertPolicy::Abort);
	}

	#[test]
	fn test_call_request_flattens_options() {
		let request = CallRequest::new(
			None,
			Bytes::from_static(&[0x60, 0x80]),
			TransactionOptions {
				gas: Some(21_000),
				..Default::default()
			},
		);

		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["gas"], 21_000);
		assert!(json.get("nonce").is_none());
	}
}
