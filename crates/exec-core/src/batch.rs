//! Batch model: descriptors, steps and the ordered batch.
//!
//! A step is either a ready descriptor or a function that builds one from the
//! results of every earlier step, for transactions that depend on something
//! only known after an earlier receipt (such as a created contract address).

use crate::error::ExecutionError;
use exec_client::{Erc20, TransactionMethod};
use exec_types::{Address, ArithmeticError, SubmittedTransaction, Wei, U256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One transaction to submit.
#[derive(Clone)]
pub struct TransactionDescriptor {
	pub method: Arc<dyn TransactionMethod>,
	/// Role of the transaction within its batch, e.g. `approve`.
	pub suffix: String,
	/// Fixed gas limit; estimated when absent.
	pub gas: Option<u64>,
	pub value: Option<Wei>,
}

impl TransactionDescriptor {
	/// Creates a descriptor with no gas limit or value.
	///
	/// # Arguments
	/// * `method` - Contract method to send
	/// * `suffix` - Role of the transaction within its batch, used in event names
	pub fn new(method: impl TransactionMethod + 'static, suffix: impl Into<String>) -> Self {
		Self::from_arc(Arc::new(method), suffix)
	}

	/// Like [`TransactionDescriptor::new`] for a method that is already shared.
	pub fn from_arc(method: Arc<dyn TransactionMethod>, suffix: impl Into<String>) -> Self {
		Self {
			method,
			suffix: suffix.into(),
			gas: None,
			value: None,
		}
	}

	/// Sets a fixed gas limit; the transaction is then sent without estimation.
	pub fn with_gas(mut self, gas: u64) -> Self {
		self.gas = Some(gas);
		self
	}

	/// Sets the wei sent along with the transaction.
	pub fn with_value(mut self, value: Wei) -> Self {
		self.value = Some(value);
		self
	}
}

impl fmt::Debug for TransactionDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransactionDescriptor")
			.field("suffix", &self.suffix)
			.field("gas", &self.gas)
			.field("value", &self.value)
			.finish_non_exhaustive()
	}
}

/// Builds a descriptor from the results of every earlier step.
pub type BuildStep = Box<
	dyn FnOnce(&[SubmittedTransaction]) -> Result<TransactionDescriptor, ExecutionError> + Send,
>;

/// One entry of a batch.
pub enum BatchStep {
	Ready(TransactionDescriptor),
	Deferred {
		suffix: String,
		/// Gas limit used for the expected fee, and for the built descriptor
		/// when it carries none.
		gas: Option<u64>,
		build: BuildStep,
	},
}

impl BatchStep {
	pub fn deferred<F>(suffix: impl Into<String>, gas: Option<u64>, build: F) -> Self
	where
		F: FnOnce(&[SubmittedTransaction]) -> Result<TransactionDescriptor, ExecutionError>
			+ Send
			+ 'static,
	{
		BatchStep::Deferred {
			suffix: suffix.into(),
			gas,
			build: Box::new(build),
		}
	}

	pub fn suffix(&self) -> &str {
		match self {
			BatchStep::Ready(descriptor) => &descriptor.suffix,
			BatchStep::Deferred { suffix, .. } => suffix,
		}
	}

	/// Gas limit known before the batch runs.
	pub fn gas(&self) -> Option<u64> {
		match self {
			BatchStep::Ready(descriptor) => descriptor.gas,
			BatchStep::Deferred { gas, .. } => *gas,
		}
	}

	/// Turns the step into a descriptor given the results so far.
	pub fn resolve(
		self,
		prior: &[SubmittedTransaction],
	) -> Result<TransactionDescriptor, ExecutionError> {
		match self {
			BatchStep::Ready(descriptor) => Ok(descriptor),
			BatchStep::Deferred { suffix, gas, build } => {
				let mut descriptor = build(prior)?;
				if descriptor.suffix != suffix {
					return Err(ExecutionError::InvalidBatch(format!(
						"Step '{}' built a descriptor for '{}'",
						suffix, descriptor.suffix
					)));
				}
				descriptor.gas = descriptor.gas.or(gas);
				Ok(descriptor)
			}
		}
	}
}

impl From<TransactionDescriptor> for BatchStep {
	fn from(descriptor: TransactionDescriptor) -> Self {
		BatchStep::Ready(descriptor)
	}
}

impl fmt::Debug for BatchStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BatchStep::Ready(descriptor) => f.debug_tuple("Ready").field(descriptor).finish(),
			BatchStep::Deferred { suffix, gas, .. } => f
				.debug_struct("Deferred")
				.field("suffix", suffix)
				.field("gas", gas)
				.finish_non_exhaustive(),
		}
	}
}

/// An ordered batch of steps with unique, non-empty suffixes.
#[derive(Debug, Default)]
pub struct TransactionBatch {
	steps: Vec<BatchStep>,
}

impl TransactionBatch {
	/// Creates a batch from its steps, in submission order.
	///
	/// # Arguments
	/// * `steps` - Ready or deferred steps
	///
	/// # Returns
	/// `ExecutionError::InvalidBatch` if a suffix is empty or used twice.
	pub fn new(steps: Vec<BatchStep>) -> Result<Self, ExecutionError> {
		let mut seen = HashSet::new();
		for step in &steps {
			let suffix = step.suffix();
			if suffix.trim().is_empty() {
				return Err(ExecutionError::InvalidBatch(
					"Transaction suffix cannot be empty".into(),
				));
			}
			if !seen.insert(suffix) {
				return Err(ExecutionError::InvalidBatch(format!(
					"Duplicate transaction suffix '{}'",
					suffix
				)));
			}
		}
		Ok(Self { steps })
	}

	/// Creates a batch where every step is ready up front.
	pub fn from_descriptors(
		descriptors: impl IntoIterator<Item = TransactionDescriptor>,
	) -> Result<Self, ExecutionError> {
		Self::new(descriptors.into_iter().map(BatchStep::Ready).collect())
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}

	pub fn suffixes(&self) -> Vec<String> {
		self.steps.iter().map(|step| step.suffix().to_string()).collect()
	}

	/// `gas_price` times the sum of known gas limits; steps without one count as zero.
	pub fn expected_fee(&self, gas_price: Wei) -> Result<Wei, ArithmeticError> {
		self.steps.iter().try_fold(Wei::ZERO, |total, step| {
			total.checked_add(gas_price.fee_for_gas(step.gas().unwrap_or(0))?)
		})
	}

	pub fn into_steps(self) -> Vec<BatchStep> {
		self.steps
	}
}

/// An `approve` step for `spender`, or `None` if the allowance already covers `amount`.
pub async fn approval_step_if_needed(
	token: &Erc20,
	owner: Address,
	spender: Address,
	amount: U256,
) -> Result<Option<BatchStep>, ExecutionError> {
	let needed = token
		.needs_approval(owner, spender, amount)
		.await
		.map_err(|e| ExecutionError::Batch(format!("Failed to read allowance: {}", e)))?;

	Ok(needed.then(|| TransactionDescriptor::new(token.approve(spender, amount), "approve").into()))
}
