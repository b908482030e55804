//! Batch executor, the public entry point of the engine.
//!
//! [`Executor::execute`] spawns the whole execution as a task and returns at
//! once. The caller reads progress from the returned [`Execution`] and awaits
//! its result; the result is delivered even if nobody reads the progress.

use crate::batch::TransactionBatch;
use crate::error::ExecutionError;
use crate::events::{EventEmitter, ExecutionEvent};
use crate::gas::GasEstimator;
use crate::runner::{ExecutionContext, SequentialRunner};
use async_trait::async_trait;
use exec_client::ChainClient;
use exec_config::ExecutionConfig;
use exec_types::{ExecutionResult, RevertPolicy, SubmittedTransaction, TransactionOptions, Wei};
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Extracts the caller's result from the mined transactions of a batch.
///
/// Plain functions and closures taking `&[SubmittedTransaction]` implement
/// this trait.
#[async_trait]
pub trait ResultParser: Send + Sync {
	type Output: Clone + Send + Sync + 'static;

	/// Called with every mined transaction in order; may be empty.
	async fn parse(&self, raw: &[SubmittedTransaction]) -> Result<Self::Output, ExecutionError>;
}

#[async_trait]
impl<F, T> ResultParser for F
where
	F: Fn(&[SubmittedTransaction]) -> Result<T, ExecutionError> + Send + Sync,
	T: Clone + Send + Sync + 'static,
{
	type Output = T;

	async fn parse(&self, raw: &[SubmittedTransaction]) -> Result<T, ExecutionError> {
		self(raw)
	}
}

/// Parser for callers that only need fees, raw results and status.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreResults;

#[async_trait]
impl ResultParser for IgnoreResults {
	type Output = ();

	async fn parse(&self, _raw: &[SubmittedTransaction]) -> Result<(), ExecutionError> {
		Ok(())
	}
}

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSettings {
	pub overestimation_factor: Decimal,
	pub revert_policy: RevertPolicy,
}

impl Default for ExecutionSettings {
	fn default() -> Self {
		Self {
			overestimation_factor: Decimal::new(125, 2),
			revert_policy: RevertPolicy::Continue,
		}
	}
}

impl From<&ExecutionConfig> for ExecutionSettings {
	fn from(config: &ExecutionConfig) -> Self {
		Self {
			overestimation_factor: config.overestimation_factor,
			revert_policy: config.revert_policy,
		}
	}
}

/// Runs batches of transactions against one chain client.
///
/// Cheap to share; executions for the same account are not coordinated, so
/// concurrent executions from one sender may collide on nonces.
#[derive(Clone)]
pub struct Executor {
	client: Arc<dyn ChainClient>,
	runner: Arc<SequentialRunner>,
}

impl Executor {
	/// Creates an executor sending through `client`.
	///
	/// # Arguments
	/// * `client` - Chain client used for every execution
	/// * `settings` - Gas overestimation factor and revert policy
	///
	/// # Returns
	/// An error if the overestimation factor is below one.
	pub fn new(
		client: Arc<dyn ChainClient>,
		settings: ExecutionSettings,
	) -> Result<Self, ExecutionError> {
		let estimator = GasEstimator::new(settings.overestimation_factor)?;
		let runner = SequentialRunner::new(client.clone(), estimator, settings.revert_policy);
		Ok(Self {
			client,
			runner: Arc::new(runner),
		})
	}

	/// Starts executing the batch `batch` resolves to.
	///
	/// Must be called from within a tokio runtime.
	pub fn execute<B, P>(
		&self,
		batch: B,
		parser: P,
		options: TransactionOptions,
	) -> Execution<P::Output>
	where
		B: Future<Output = Result<TransactionBatch, ExecutionError>> + Send + 'static,
		P: ResultParser + 'static,
	{
		let (events, receiver) = EventEmitter::channel();
		let client = self.client.clone();
		let runner = self.runner.clone();

		let handle = tokio::spawn(async move {
			let result = run_execution(client, runner, batch, parser, options, &events).await;
			match &result {
				Ok(result) => {
					tracing::info!(
						transactions = result.raw.len(),
						fees = %result.fees,
						status = result.status,
						"Batch completed"
					);
					events.emit(ExecutionEvent::Completed(result.clone()));
				}
				Err(error) => {
					tracing::warn!(error = %error, "Batch failed");
					events.emit(ExecutionEvent::Failed(error.clone()));
				}
			}
			result
		});

		Execution {
			events: receiver,
			handle: ExecutionHandle { handle },
		}
	}
}

#[instrument(skip_all)]
async fn run_execution<B, P>(
	client: Arc<dyn ChainClient>,
	runner: Arc<SequentialRunner>,
	batch: B,
	parser: P,
	options: TransactionOptions,
	events: &EventEmitter<P::Output>,
) -> Result<ExecutionResult<P::Output>, ExecutionError>
where
	B: Future<Output = Result<TransactionBatch, ExecutionError>> + Send,
	P: ResultParser,
{
	let batch = batch.await?;

	let gas_price = match options.gas_price {
		Some(gas_price) => gas_price,
		None => client.get_gas_price().await.map_err(ExecutionError::GasPrice)?,
	};
	let expected_fee = batch.expected_fee(gas_price)?;
	tracing::debug!(%gas_price, %expected_fee, steps = batch.len(), "Batch built");
	events.emit(ExecutionEvent::Transactions {
		expected_fee,
		suffixes: batch.suffixes(),
	});

	let from = options
		.from
		.or_else(|| client.default_sender())
		.ok_or(ExecutionError::MissingSender)?;
	let context = ExecutionContext {
		from,
		gas_price,
		gas: options.gas,
		value: options.value,
	};

	let raw = runner.run(batch, &context, events).await?;
	let parsed = parser.parse(&raw).await?;

	let fees = raw
		.iter()
		.map(|submitted| submitted.fee(gas_price))
		.collect::<Result<Vec<Wei>, _>>()?;
	let fees = Wei::try_sum(fees)?;
	let status = raw.last().is_none_or(|submitted| submitted.receipt.status);

	Ok(ExecutionResult {
		parsed,
		fees,
		raw,
		status,
	})
}

/// A running batch execution.
pub struct Execution<T> {
	events: mpsc::UnboundedReceiver<ExecutionEvent<T>>,
	handle: ExecutionHandle<T>,
}

impl<T> Execution<T> {
	/// Next progress event, or `None` once the execution has finished and
	/// every event was read.
	pub async fn next_event(&mut self) -> Option<ExecutionEvent<T>> {
		self.events.recv().await
	}

	/// Splits into the progress receiver and the result handle.
	///
	/// Dropping the receiver is fine; the handle still yields the result.
	pub fn into_parts(self) -> (mpsc::UnboundedReceiver<ExecutionEvent<T>>, ExecutionHandle<T>) {
		(self.events, self.handle)
	}

	/// Waits for the result, discarding unread progress.
	pub async fn result(self) -> Result<ExecutionResult<T>, ExecutionError> {
		self.handle.await
	}
}

/// Resolves to the result of an execution.
pub struct ExecutionHandle<T> {
	handle: JoinHandle<Result<ExecutionResult<T>, ExecutionError>>,
}

impl<T> Future for ExecutionHandle<T> {
	type Output = Result<ExecutionResult<T>, ExecutionError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.handle).poll(cx).map(|joined| {
			joined.unwrap_or_else(|e| {
				Err(ExecutionError::Internal(format!(
					"Execution task failed: {}",
					e
				)))
			})
		})
	}
}
