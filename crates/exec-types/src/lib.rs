//! Common types for the transaction execution engine.
//!
//! This crate defines the data model shared by the chain client, the
//! configuration layer and the executor: transaction requests and the chain's
//! view of sent transactions, receipts, exact wei arithmetic and the terminal
//! result of a batch execution.

/// Exact wei arithmetic and gas overestimation.
pub mod fees;
/// Network configuration types.
pub mod networks;
/// Secret string wrapper for private keys.
pub mod secret_string;
/// Transaction requests, transactions, receipts and execution results.
pub mod transaction;
/// Utility functions for string formatting.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
pub use fees::{overestimate_gas, ArithmeticError, Wei};
pub use networks::NetworkConfig;
pub use secret_string::SecretString;
pub use transaction::*;
pub use utils::{format_units, truncate_id, with_0x_prefix};
