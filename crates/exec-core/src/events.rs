//! Progress events of a batch execution.
//!
//! Every execution owns one unbounded channel. Events are sent in the order
//! they happen; if the receiving side has been dropped they are discarded and
//! the execution carries on.

use crate::error::ExecutionError;
use exec_types::{ExecutionResult, Transaction, TransactionReceipt, TxHash, Wei};
use tokio::sync::mpsc;

/// One step of progress of a batch execution.
#[derive(Debug, Clone)]
pub enum ExecutionEvent<T> {
	/// The batch is built and about to run.
	Transactions {
		/// Gas price times the sum of known gas limits.
		expected_fee: Wei,
		suffixes: Vec<String>,
	},
	EstimatedGas {
		index: usize,
		suffix: String,
		gas: u64,
	},
	TransactionHash {
		index: usize,
		suffix: String,
		hash: TxHash,
	},
	Receipt {
		index: usize,
		suffix: String,
		transaction: Transaction,
		receipt: TransactionReceipt,
	},
	Completed(ExecutionResult<T>),
	Failed(ExecutionError),
}

impl<T> ExecutionEvent<T> {
	/// Event name, e.g. `transactionHash-approve`.
	pub fn name(&self) -> String {
		match self {
			ExecutionEvent::Transactions { .. } => "transactions".to_string(),
			ExecutionEvent::EstimatedGas { suffix, .. } => format!("estimatedGas-{}", suffix),
			ExecutionEvent::TransactionHash { suffix, .. } => format!("transactionHash-{}", suffix),
			ExecutionEvent::Receipt { suffix, .. } => format!("receipt-{}", suffix),
			ExecutionEvent::Completed(_) => "result".to_string(),
			ExecutionEvent::Failed(_) => "error".to_string(),
		}
	}

	pub fn suffix(&self) -> Option<&str> {
		match self {
			ExecutionEvent::EstimatedGas { suffix, .. }
			| ExecutionEvent::TransactionHash { suffix, .. }
			| ExecutionEvent::Receipt { suffix, .. } => Some(suffix),
			ExecutionEvent::Failed(error) => error.suffix(),
			_ => None,
		}
	}

	/// Whether this is the last event of an execution.
	pub fn is_terminal(&self) -> bool {
		matches!(self, ExecutionEvent::Completed(_) | ExecutionEvent::Failed(_))
	}
}

/// Sending half of an execution's progress channel.
pub struct EventEmitter<T> {
	sender: mpsc::UnboundedSender<ExecutionEvent<T>>,
}

impl<T> Clone for EventEmitter<T> {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

impl<T> EventEmitter<T> {
	pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent<T>>) -> Self {
		Self { sender }
	}

	/// Creates an emitter together with its receiving half.
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent<T>>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(Self::new(sender), receiver)
	}

	pub fn emit(&self, event: ExecutionEvent<T>) {
		if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
			tracing::trace!(event = %event.name(), "No listener, dropping event");
		}
	}
}
