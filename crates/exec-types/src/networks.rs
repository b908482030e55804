//! Network configuration.
//!
//! One executor talks to one chain; the network section of the configuration
//! names the chain and the RPC endpoint used to reach it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the chain transactions are executed on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// EIP-155 chain id, used when signing.
	pub chain_id: u64,
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
	/// How often to poll for a receipt once a transaction is broadcast.
	#[serde(default = "default_receipt_poll_interval_ms")]
	pub receipt_poll_interval_ms: u64,
}

fn default_receipt_poll_interval_ms() -> u64 {
	1_000
}

impl NetworkConfig {
	pub fn receipt_poll_interval(&self) -> Duration {
		Duration::from_millis(self.receipt_poll_interval_ms)
	}
}
