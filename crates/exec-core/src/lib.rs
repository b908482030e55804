//! Multi-transaction execution engine.
//!
//! Given an ordered batch of transactions (say an `approve` followed by a
//! `create`), the engine estimates gas for each, submits them one at a time
//! with contiguous nonces, waits for every receipt, sums the fees actually
//! paid and reports progress as [`ExecutionEvent`]s along the way.
//!
//! The pieces, leaves first:
//! - [`GasEstimator`] pads raw gas estimates by an exact overestimation factor.
//! - [`Submitter`] sends one transaction and waits for it to be mined.
//! - [`SequentialRunner`] assigns nonces and runs the steps of a batch in order.
//! - [`Executor`] ties it together and is the entry point for callers.

pub mod batch;
pub mod error;
pub mod events;
pub mod executor;
pub mod gas;
pub mod revert;
pub mod runner;
pub mod submitter;

pub use batch::{approval_step_if_needed, BatchStep, BuildStep, TransactionBatch, TransactionDescriptor};
pub use error::ExecutionError;
pub use events::{EventEmitter, ExecutionEvent};
pub use executor::{
	Execution, ExecutionHandle, ExecutionSettings, Executor, IgnoreResults, ResultParser,
};
pub use gas::GasEstimator;
pub use revert::{first_line, revert_reason};
pub use runner::{ExecutionContext, SequentialRunner};
pub use submitter::{Submitter, TransactionCache};
