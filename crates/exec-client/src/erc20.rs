//! ERC-20 reads and calls.
//!
//! Batches that move tokens usually start with an `approve`, and whether that
//! step is needed depends on the current allowance. This module covers both
//! the read and the calls.

use crate::{ChainClient, ClientError, ContractCall};
use alloy_sol_types::{sol, SolCall};
use exec_types::{Address, CallRequest, TransactionOptions, U256};
use std::sync::Arc;

sol! {
	interface IERC20 {
		function allowance(address owner, address spender) external view returns (uint256);
		function balanceOf(address account) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

/// An ERC-20 token contract.
#[derive(Clone)]
pub struct Erc20 {
	client: Arc<dyn ChainClient>,
	token: Address,
}

impl Erc20 {
	pub fn new(client: Arc<dyn ChainClient>, token: Address) -> Self {
		Self { client, token }
	}

	pub fn address(&self) -> Address {
		self.token
	}

	pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, ClientError> {
		let output = self
			.read(IERC20::allowanceCall { owner, spender }.abi_encode())
			.await?;
		IERC20::allowanceCall::abi_decode_returns(&output, true)
			.map(|decoded| decoded._0)
			.map_err(|e| ClientError::InvalidInput(format!("Invalid allowance response: {}", e)))
	}

	pub async fn balance_of(&self, account: Address) -> Result<U256, ClientError> {
		let output = self.read(IERC20::balanceOfCall { account }.abi_encode()).await?;
		IERC20::balanceOfCall::abi_decode_returns(&output, true)
			.map(|decoded| decoded._0)
			.map_err(|e| ClientError::InvalidInput(format!("Invalid balanceOf response: {}", e)))
	}

	/// Whether `owner` must approve `spender` before it can move `amount`.
	pub async fn needs_approval(
		&self,
		owner: Address,
		spender: Address,
		amount: U256,
	) -> Result<bool, ClientError> {
		let allowance = self.allowance(owner, spender).await?;
		tracing::debug!(token = %self.token, %allowance, %amount, "Checked allowance");
		Ok(allowance < amount)
	}

	pub fn approve(&self, spender: Address, amount: U256) -> ContractCall {
		ContractCall::encode(
			self.client.clone(),
			self.token,
			&IERC20::approveCall { spender, amount },
		)
	}

	async fn read(&self, data: Vec<u8>) -> Result<Vec<u8>, ClientError> {
		let request = CallRequest::new(Some(self.token), data.into(), TransactionOptions::default());
		Ok(self.client.call(&request).await?.to_vec())
	}
}
