//! Configuration for the transaction execution engine.
//!
//! Configuration is a single TOML file. String values may reference
//! environment variables as `${VAR}` or `${VAR:-default}`; references are
//! resolved before parsing so secrets such as the private key can stay out of
//! the file.

use exec_types::{NetworkConfig, RevertPolicy, SecretString};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering repeats the input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Chain the engine talks to.
	pub network: NetworkConfig,
	/// Signing account.
	pub account: AccountConfig,
	/// Batch execution behavior.
	#[serde(default)]
	pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex-encoded private key, usually `${PRIVATE_KEY}`.
	pub private_key: SecretString,
}

/// Settings applied to every batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecutionConfig {
	/// Multiplier applied to raw gas estimates. Must be at least 1.
	#[serde(default = "default_overestimation_factor")]
	pub overestimation_factor: Decimal,
	#[serde(default)]
	pub revert_policy: RevertPolicy,
}

impl Default for ExecutionConfig {
	fn default() -> Self {
		Self {
			overestimation_factor: default_overestimation_factor(),
			revert_policy: RevertPolicy::default(),
		}
	}
}

/// Returns the default overestimation factor (1.25).
fn default_overestimation_factor() -> Decimal {
	Decimal::new(125, 2)
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				}
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Checks values serde cannot check on its own.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation(
				"network.chain_id must be greater than 0".into(),
			));
		}
		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"network.rpc_url cannot be empty".into(),
			));
		}
		if self.network.receipt_poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"network.receipt_poll_interval_ms must be greater than 0".into(),
			));
		}
		if self.account.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"account.private_key cannot be empty".into(),
			));
		}
		if self.execution.overestimation_factor < Decimal::ONE {
			return Err(ConfigError::Validation(format!(
				"execution.overestimation_factor must be at least 1, got {}",
				self.execution.overestimation_factor
			)));
		}
		Ok(())
	}
}

/// Parses configuration from a TOML string, resolving environment variables
/// first and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
