//! Sequential batch runner.
//!
//! Steps run strictly one after another with contiguous nonces starting at
//! the sender's pending transaction count, so several transactions can be
//! chained without waiting for the chain to catch up between them.

use crate::batch::TransactionBatch;
use crate::error::ExecutionError;
use crate::events::EventEmitter;
use crate::gas::GasEstimator;
use crate::submitter::Submitter;
use exec_client::ChainClient;
use exec_types::{
	Address, ArithmeticError, BlockTag, RevertPolicy, SubmittedTransaction, TransactionOptions, Wei,
};
use std::sync::Arc;
use tracing::instrument;

/// State of one execution, shared by every step of its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
	pub from: Address,
	pub gas_price: Wei,
	/// Gas limit for steps that carry none.
	pub gas: Option<u64>,
	/// Value for steps that carry none.
	pub value: Option<Wei>,
}

/// Runs the steps of a batch in order.
///
/// Holds no per-batch state; transactions looked up during a run are dropped
/// with it.
pub struct SequentialRunner {
	client: Arc<dyn ChainClient>,
	estimator: GasEstimator,
	revert_policy: RevertPolicy,
}

impl SequentialRunner {
	/// Creates a runner for `client`.
	///
	/// # Arguments
	/// * `client` - Chain client used for nonces, estimation and submission
	/// * `estimator` - Pads estimates for steps without a fixed gas limit
	/// * `revert_policy` - Whether a reverted step ends the run
	pub fn new(
		client: Arc<dyn ChainClient>,
		estimator: GasEstimator,
		revert_policy: RevertPolicy,
	) -> Self {
		Self {
			client,
			estimator,
			revert_policy,
		}
	}

	/// Runs every step of `batch` and returns the results in order.
	///
	/// The first failing step ends the run; later steps are never built.
	#[instrument(skip_all, fields(from = %context.from, steps = batch.len()))]
	pub async fn run<T>(
		&self,
		batch: TransactionBatch,
		context: &ExecutionContext,
		events: &EventEmitter<T>,
	) -> Result<Vec<SubmittedTransaction>, ExecutionError> {
		let starting_nonce = self
			.client
			.get_transaction_count(context.from, BlockTag::Pending)
			.await
			.map_err(ExecutionError::Nonce)?;
		tracing::debug!(starting_nonce, "Fetched pending nonce");

		let submitter = Submitter::new(self.client.clone());
		let mut results: Vec<SubmittedTransaction> = Vec::with_capacity(batch.len());

		for (index, step) in batch.into_steps().into_iter().enumerate() {
			let descriptor = step.resolve(&results)?;
			let nonce = u64::try_from(index)
				.ok()
				.and_then(|offset| starting_nonce.checked_add(offset))
				.ok_or(ArithmeticError::Overflow)?;

			let mut options = TransactionOptions {
				from: Some(context.from),
				gas: descriptor.gas.or(context.gas),
				gas_price: Some(context.gas_price),
				value: descriptor.value.or(context.value),
				nonce: Some(nonce),
			};

			let gas = self
				.estimator
				.estimate(
					descriptor.method.as_ref(),
					&options,
					&descriptor.suffix,
					index,
					events,
				)
				.await?;
			options.gas = Some(gas);

			let submitted = submitter
				.submit(
					descriptor.method.as_ref(),
					options,
					&descriptor.suffix,
					index,
					events,
				)
				.await?;

			if !submitted.receipt.status {
				tracing::warn!(
					suffix = %descriptor.suffix,
					tx_hash = %submitted.receipt.hash,
					"Transaction reverted"
				);
				if self.revert_policy == RevertPolicy::Abort {
					return Err(ExecutionError::Reverted {
						suffix: descriptor.suffix,
						hash: submitted.receipt.hash,
					});
				}
			}

			results.push(submitted);
		}

		Ok(results)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::batch::{BatchStep, TransactionDescriptor};
	use exec_client::implementations::mock::{MockCall, MockChainClient, MOCK_SENDER};
	use exec_client::{ClientError, ContractCall};
	use exec_types::Bytes;

	fn context() -> ExecutionContext {
		ExecutionContext {
			from: MOCK_SENDER,
			gas_price: Wei::from(1_000_000_000u64),
			gas: None,
			value: None,
		}
	}

	fn step(client: &Arc<MockChainClient>, target: Address, suffix: &str) -> BatchStep {
		TransactionDescriptor::new(ContractCall::new(client.clone(), target, Bytes::new()), suffix)
			.into()
	}

	fn runner(client: &Arc<MockChainClient>, policy: RevertPolicy) -> SequentialRunner {
		SequentialRunner::new(client.clone(), GasEstimator::default(), policy)
	}

	#[tokio::test]
	async fn test_nonces_are_contiguous_and_ordered() {
		let mock = Arc::new(MockChainClient::new().with_nonce(7));
		let targets: Vec<Address> = (1..=3).map(Address::repeat_byte).collect();
		let batch = TransactionBatch::new(vec![
			step(&mock, targets[0], "approve"),
			step(&mock, targets[1], "create"),
			step(&mock, targets[2], "start"),
		])
		.unwrap();
		let (events, _receiver) = EventEmitter::<()>::channel();

		let results = runner(&mock, RevertPolicy::Continue)
			.run(batch, &context(), &events)
			.await
			.unwrap();

		let nonces: Vec<u64> = results.iter().map(|r| r.transaction.nonce).collect();
		assert_eq!(nonces, vec![7, 8, 9]);
		let sent: Vec<Option<u64>> = mock.sent().iter().map(|r| r.options.nonce).collect();
		assert_eq!(sent, vec![Some(7), Some(8), Some(9)]);

		// Each send happens only after the previous receipt was delivered.
		let calls = mock.calls();
		let position = |wanted: &dyn Fn(&MockCall) -> bool| {
			calls.iter().position(|c| wanted(c)).unwrap()
		};
		for i in 0..2 {
			let mined = results[i].receipt.hash;
			let next = targets[i + 1];
			let mined_at = position(&|c| matches!(c, MockCall::Mined(h) if *h == mined));
			let sent_at = position(&|c| matches!(c, MockCall::Send(r) if r.to == Some(next)));
			assert!(mined_at < sent_at);
		}
	}

	#[tokio::test]
	async fn test_gas_hint_skips_estimation() {
		let mock = Arc::new(MockChainClient::new().with_estimate(Address::repeat_byte(2), 40_000));
		let fixed = TransactionDescriptor::new(
			ContractCall::new(mock.clone(), Address::repeat_byte(1), Bytes::new()),
			"approve",
		)
		.with_gas(60_000);
		let batch = TransactionBatch::new(vec![
			fixed.into(),
			step(&mock, Address::repeat_byte(2), "create"),
		])
		.unwrap();
		let (events, _receiver) = EventEmitter::<()>::channel();

		let results = runner(&mock, RevertPolicy::Continue)
			.run(batch, &context(), &events)
			.await
			.unwrap();

		assert_eq!(mock.count(|c| matches!(c, MockCall::EstimateGas(_))), 1);
		assert_eq!(results[0].transaction.gas_limit, 60_000);
		assert_eq!(results[1].transaction.gas_limit, 50_000);
	}

	#[tokio::test]
	async fn test_revert_continues_by_default() {
		let first = Address::repeat_byte(1);
		let mock = Arc::new(MockChainClient::new().revert(first));
		let batch = TransactionBatch::new(vec![
			step(&mock, first, "approve"),
			step(&mock, Address::repeat_byte(2), "create"),
		])
		.unwrap();
		let (events, _receiver) = EventEmitter::<()>::channel();

		let results = runner(&mock, RevertPolicy::Continue)
			.run(batch, &context(), &events)
			.await
			.unwrap();

		assert_eq!(results.len(), 2);
		assert!(!results[0].receipt.status);
		assert!(results[1].receipt.status);
	}

	#[tokio::test]
	async fn test_revert_aborts_under_abort_policy() {
		let first = Address::repeat_byte(1);
		let mock = Arc::new(MockChainClient::new().revert(first));
		let batch = TransactionBatch::new(vec![
			step(&mock, first, "approve"),
			step(&mock, Address::repeat_byte(2), "create"),
		])
		.unwrap();
		let (events, _receiver) = EventEmitter::<()>::channel();

		let err = runner(&mock, RevertPolicy::Abort)
			.run(batch, &context(), &events)
			.await
			.unwrap_err();

		assert!(matches!(err, ExecutionError::Reverted { ref suffix, .. } if suffix == "approve"));
		assert_eq!(mock.sent().len(), 1);
	}

	#[tokio::test]
	async fn test_failure_stops_remaining_steps() {
		let first = Address::repeat_byte(1);
		let mock = Arc::new(
			MockChainClient::new().fail_send(first, ClientError::Rejected("denied".to_string())),
		);
		let built = Arc::new(std::sync::atomic::AtomicBool::new(false));
		let flag = built.clone();
		let second = step(&mock, Address::repeat_byte(2), "create");
		let batch = TransactionBatch::new(vec![
			step(&mock, first, "approve"),
			BatchStep::deferred("create", None, move |_| {
				flag.store(true, std::sync::atomic::Ordering::SeqCst);
				match second {
					BatchStep::Ready(descriptor) => Ok(descriptor),
					BatchStep::Deferred { .. } => unreachable!(),
				}
			}),
		])
		.unwrap();
		let (events, _receiver) = EventEmitter::<()>::channel();

		let err = runner(&mock, RevertPolicy::Continue)
			.run(batch, &context(), &events)
			.await
			.unwrap_err();

		assert!(matches!(err, ExecutionError::Submission { .. }));
		assert!(!built.load(std::sync::atomic::Ordering::SeqCst));
		assert_eq!(mock.sent().len(), 1);
	}

	#[tokio::test]
	async fn test_deferred_step_sees_prior_results() {
		let mock = Arc::new(MockChainClient::new());
		let client = mock.clone();
		let batch = TransactionBatch::new(vec![
			TransactionDescriptor::new(
				ContractCall::deploy(mock.clone(), Bytes::from_static(&[0x60, 0x80])),
				"deploy",
			)
			.into(),
			BatchStep::deferred("initialize", Some(80_000), move |prior| {
				let created = prior[0].receipt.contract_address.ok_or_else(|| {
					ExecutionError::Batch("deployment created no contract".to_string())
				})?;
				Ok(TransactionDescriptor::new(
					ContractCall::new(client, created, Bytes::from_static(&[0x81, 0x29])),
					"initialize",
				))
			}),
		])
		.unwrap();
		let (events, _receiver) = EventEmitter::<()>::channel();

		let results = runner(&mock, RevertPolicy::Continue)
			.run(batch, &context(), &events)
			.await
			.unwrap();

		let created = results[0].receipt.contract_address.unwrap();
		assert_eq!(created, MOCK_SENDER.create(0));
		assert_eq!(results[1].transaction.to, Some(created));
		assert_eq!(results[1].transaction.gas_limit, 80_000);
	}

	#[tokio::test]
	async fn test_empty_batch_only_reads_nonce() {
		let mock = Arc::new(MockChainClient::new());
		let (events, _receiver) = EventEmitter::<()>::channel();

		let results = runner(&mock, RevertPolicy::Continue)
			.run(TransactionBatch::default(), &context(), &events)
			.await
			.unwrap();

		assert!(results.is_empty());
		assert_eq!(
			mock.calls(),
			vec![MockCall::TransactionCount {
				address: MOCK_SENDER,
				tag: BlockTag::Pending,
			}]
		);
	}
}
