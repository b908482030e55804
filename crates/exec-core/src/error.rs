//! Errors surfaced by a batch execution.

use crate::revert::revert_reason;
use exec_client::ClientError;
use exec_types::{ArithmeticError, TxHash};
use thiserror::Error;

/// Errors that end a batch execution.
///
/// The same value is delivered on the progress channel and through the
/// result handle, so it must be `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
	/// The batch future itself failed, usually a chain read made while building it.
	#[error("Failed to build batch: {0}")]
	Batch(String),
	/// The batch is malformed (empty or duplicate suffixes).
	#[error("Invalid batch: {0}")]
	InvalidBatch(String),
	#[error("Failed to get gas price: {0}")]
	GasPrice(#[source] ClientError),
	/// No `from` was given and the client has no default account.
	#[error("No sender account available")]
	MissingSender,
	#[error("Failed to get nonce: {0}")]
	Nonce(#[source] ClientError),
	#[error("Gas estimation failed for '{suffix}': {source}")]
	Estimation {
		suffix: String,
		#[source]
		source: ClientError,
	},
	#[error("Failed to submit '{suffix}': {source}")]
	Submission {
		suffix: String,
		#[source]
		source: ClientError,
	},
	#[error("Failed to get receipt for '{suffix}': {source}")]
	Receipt {
		suffix: String,
		#[source]
		source: ClientError,
	},
	/// A transaction was mined with `status: false` under the abort policy.
	#[error("Transaction '{suffix}' reverted: {hash}")]
	Reverted { suffix: String, hash: TxHash },
	#[error("Failed to parse results: {0}")]
	Parse(String),
	#[error("Arithmetic error: {0}")]
	Arithmetic(#[from] ArithmeticError),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl ExecutionError {
	/// Suffix of the transaction that failed, when the failure belongs to one.
	pub fn suffix(&self) -> Option<&str> {
		match self {
			ExecutionError::Estimation { suffix, .. }
			| ExecutionError::Submission { suffix, .. }
			| ExecutionError::Receipt { suffix, .. }
			| ExecutionError::Reverted { suffix, .. } => Some(suffix),
			_ => None,
		}
	}

	/// Short human readable reason, for display.
	pub fn reason(&self) -> String {
		match self {
			ExecutionError::Estimation { source, .. }
			| ExecutionError::Submission { source, .. } => revert_reason(&source.to_string()),
			other => revert_reason(&other.to_string()),
		}
	}
}
