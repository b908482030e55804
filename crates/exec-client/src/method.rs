//! Contract calls as transaction methods.

use crate::{ChainClient, ClientError, PendingTransaction, TransactionMethod};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use exec_types::{Address, Bytes, CallRequest, TransactionOptions};
use std::sync::Arc;

/// A call to a contract (or a deployment) bound to a chain client.
#[derive(Clone)]
pub struct ContractCall {
	client: Arc<dyn ChainClient>,
	to: Option<Address>,
	data: Bytes,
}

impl ContractCall {
	pub fn new(client: Arc<dyn ChainClient>, to: Address, data: Bytes) -> Self {
		Self {
			client,
			to: Some(to),
			data,
		}
	}

	/// Deploys `init_code` as a new contract.
	pub fn deploy(client: Arc<dyn ChainClient>, init_code: Bytes) -> Self {
		Self {
			client,
			to: None,
			data: init_code,
		}
	}

	/// ABI-encodes `call` against the contract at `to`.
	pub fn encode<C: SolCall>(client: Arc<dyn ChainClient>, to: Address, call: &C) -> Self {
		Self::new(client, to, call.abi_encode().into())
	}

	pub fn to(&self) -> Option<Address> {
		self.to
	}

	pub fn data(&self) -> &Bytes {
		&self.data
	}

	fn request(&self, options: TransactionOptions) -> CallRequest {
		CallRequest::new(self.to, self.data.clone(), options)
	}
}

impl std::fmt::Debug for ContractCall {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ContractCall")
			.field("to", &self.to)
			.field("data", &self.data)
			.finish()
	}
}

#[async_trait]
impl TransactionMethod for ContractCall {
	async fn estimate_gas(&self, options: &TransactionOptions) -> Result<u64, ClientError> {
		let request = self.request(options.clone());
		self.client.estimate_gas(&request).await
	}

	async fn send(&self, options: TransactionOptions) -> Result<PendingTransaction, ClientError> {
		self.client.send_transaction(self.request(options)).await
	}
}
