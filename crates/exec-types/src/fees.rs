//! Exact fee arithmetic.
//!
//! Wei amounts are 256-bit integers and never pass through floating point.
//! Gas overestimation factors are exact decimals so that, for example,
//! `21000 × 1.1` is `23100` and not `23100.000000000004` rounded up.

use crate::utils::format_units;
use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced by fee arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
	/// The result does not fit in 256 bits.
	#[error("Wei amount overflow")]
	Overflow,
	/// A gas amount could not be represented as `u64`.
	#[error("Gas amount out of range: {0}")]
	GasOutOfRange(String),
	/// The overestimation factor is below one.
	#[error("Overestimation factor must be at least 1, got {0}")]
	InvalidFactor(Decimal),
	/// A decimal string could not be parsed.
	#[error("Invalid wei amount '{0}'")]
	Parse(String),
}

/// An amount of wei.
///
/// Serializes as an exact decimal string, the format callers display and
/// compare fees in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(pub U256);

impl Wei {
	pub const ZERO: Wei = Wei(U256::ZERO);

	/// Fee for `gas` units at `self` wei per unit.
	pub fn fee_for_gas(self, gas: u64) -> Result<Wei, ArithmeticError> {
		self.0
			.checked_mul(U256::from(gas))
			.map(Wei)
			.ok_or(ArithmeticError::Overflow)
	}

	pub fn checked_add(self, other: Wei) -> Result<Wei, ArithmeticError> {
		self.0
			.checked_add(other.0)
			.map(Wei)
			.ok_or(ArithmeticError::Overflow)
	}

	/// Sums fallibly, failing on overflow instead of wrapping.
	pub fn try_sum<I>(amounts: I) -> Result<Wei, ArithmeticError>
	where
		I: IntoIterator<Item = Wei>,
	{
		amounts
			.into_iter()
			.try_fold(Wei::ZERO, |acc, amount| acc.checked_add(amount))
	}

	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	/// Formats the amount with `decimals` places, e.g. `format(18)` for ether.
	pub fn format(&self, decimals: u8) -> String {
		format_units(&self.0.to_string(), decimals)
	}
}

impl From<u64> for Wei {
	fn from(value: u64) -> Self {
		Wei(U256::from(value))
	}
}

impl From<u128> for Wei {
	fn from(value: u128) -> Self {
		Wei(U256::from(value))
	}
}

impl From<U256> for Wei {
	fn from(value: U256) -> Self {
		Wei(value)
	}
}

impl fmt::Display for Wei {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for Wei {
	type Err = ArithmeticError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		U256::from_str_radix(s.trim(), 10)
			.map(Wei)
			.map_err(|_| ArithmeticError::Parse(s.to_string()))
	}
}

impl Serialize for Wei {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.0.to_string().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Wei {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr {
			Text(String),
			Number(u64),
		}

		match Repr::deserialize(deserializer)? {
			Repr::Text(s) => s.parse().map_err(D::Error::custom),
			Repr::Number(n) => Ok(Wei::from(n)),
		}
	}
}

/// Pads a raw gas estimate: `ceil(units × factor)`.
pub fn overestimate_gas(units: u64, factor: Decimal) -> Result<u64, ArithmeticError> {
	if factor < Decimal::ONE {
		return Err(ArithmeticError::InvalidFactor(factor));
	}

	let padded = Decimal::from(units)
		.checked_mul(factor)
		.ok_or_else(|| ArithmeticError::GasOutOfRange(units.to_string()))?
		.ceil();

	padded
		.to_u64()
		.ok_or_else(|| ArithmeticError::GasOutOfRange(padded.to_string()))
}
