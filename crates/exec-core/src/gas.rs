//! Gas limit estimation.

use crate::error::ExecutionError;
use crate::events::{EventEmitter, ExecutionEvent};
use exec_client::TransactionMethod;
use exec_types::{overestimate_gas, ArithmeticError, TransactionOptions};
use rust_decimal::Decimal;
use tracing::instrument;

/// Pads raw gas estimates by a fixed overestimation factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimator {
	factor: Decimal,
}

impl GasEstimator {
	/// Creates an estimator multiplying every estimate by `factor`.
	///
	/// # Returns
	/// An error if `factor` is below one.
	pub fn new(factor: Decimal) -> Result<Self, ExecutionError> {
		if factor < Decimal::ONE {
			return Err(ArithmeticError::InvalidFactor(factor).into());
		}
		Ok(Self { factor })
	}

	/// Gas limit for one transaction.
	///
	/// A gas limit already present in `options` is returned as is, without a
	/// chain call or an event. Otherwise the method is estimated, padded and
	/// an `EstimatedGas` event is emitted.
	#[instrument(skip_all, fields(suffix = %suffix))]
	pub async fn estimate<T>(
		&self,
		method: &dyn TransactionMethod,
		options: &TransactionOptions,
		suffix: &str,
		index: usize,
		events: &EventEmitter<T>,
	) -> Result<u64, ExecutionError> {
		if let Some(gas) = options.gas {
			return Ok(gas);
		}

		let units = method.estimate_gas(options).await.map_err(|source| {
			tracing::warn!(error = %source, "Gas estimation failed");
			ExecutionError::Estimation {
				suffix: suffix.to_string(),
				source,
			}
		})?;
		let gas = overestimate_gas(units, self.factor)?;

		tracing::debug!(units, gas, factor = %self.factor, "Estimated gas");
		events.emit(ExecutionEvent::EstimatedGas {
			index,
			suffix: suffix.to_string(),
			gas,
		});
		Ok(gas)
	}
}

impl Default for GasEstimator {
	fn default() -> Self {
		Self {
			factor: Decimal::new(125, 2),
		}
	}
}
