//! Alloy-backed chain client.
//!
//! Signs with a local private key through the provider's wallet filler and
//! talks to a single HTTP RPC endpoint.

use crate::{ChainClient, ClientError, PendingTransaction};
use alloy_consensus::Transaction as _;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{Transaction as RpcTransaction, TransactionReceipt as RpcReceipt, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use exec_types::{
	with_0x_prefix, BlockTag, CallRequest, LogEntry, NetworkConfig, SecretString, Transaction,
	TransactionReceipt, TxHash, Wei,
};
use std::sync::Arc;
use std::time::Duration;

type DynProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// Alloy-based EVM client bound to one network and one signing account.
pub struct AlloyClient {
	provider: DynProvider,
	chain_id: u64,
	sender: Address,
	poll_interval: Duration,
}

impl AlloyClient {
	pub fn new(network: &NetworkConfig, signer: PrivateKeySigner) -> Result<Self, ClientError> {
		let url = network.rpc_url.parse().map_err(|e| {
			ClientError::InvalidInput(format!("Invalid RPC URL {}: {}", network.rpc_url, e))
		})?;

		let sender = signer.address();
		let wallet = EthereumWallet::from(signer.with_chain_id(Some(network.chain_id)));

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		tracing::debug!(chain_id = network.chain_id, sender = %sender, "Created chain client");

		Ok(Self {
			provider: Arc::new(provider) as DynProvider,
			chain_id: network.chain_id,
			sender,
			poll_interval: network.receipt_poll_interval(),
		})
	}

	fn transaction_request(&self, request: &CallRequest) -> Result<TransactionRequest, ClientError> {
		let options = &request.options;
		let mut tx = TransactionRequest::default().with_from(options.from.unwrap_or(self.sender));

		tx = match request.to {
			Some(to) => tx.with_to(to).with_input(request.data.clone()),
			None => tx.with_deploy_code(request.data.clone()),
		};
		if let Some(gas) = options.gas {
			tx = tx.with_gas_limit(gas);
		}
		if let Some(gas_price) = options.gas_price {
			let gas_price = u128::try_from(gas_price.0).map_err(|_| {
				ClientError::InvalidInput(format!("Gas price {} out of range", gas_price))
			})?;
			tx = tx.with_gas_price(gas_price);
		}
		if let Some(value) = options.value {
			tx = tx.with_value(value.0);
		}
		if let Some(nonce) = options.nonce {
			tx = tx.with_nonce(nonce);
		}
		Ok(tx)
	}
}

/// Creates a client from network settings and a hex-encoded private key.
pub fn create_client(
	network: &NetworkConfig,
	private_key: &SecretString,
) -> Result<AlloyClient, ClientError> {
	let signer = private_key.with_exposed(|key| {
		key.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| ClientError::InvalidInput(format!("Invalid private key: {}", e)))
	})?;
	AlloyClient::new(network, signer)
}

#[async_trait]
impl ChainClient for AlloyClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn default_sender(&self) -> Option<Address> {
		Some(self.sender)
	}

	async fn get_gas_price(&self) -> Result<Wei, ClientError> {
		let gas_price = self
			.provider
			.get_gas_price()
			.await
			.map_err(|e| ClientError::Network(format!("Failed to get gas price: {}", e)))?;
		Ok(Wei::from(gas_price))
	}

	async fn get_transaction_count(
		&self,
		address: Address,
		tag: BlockTag,
	) -> Result<u64, ClientError> {
		let count = self.provider.get_transaction_count(address);
		let count = match tag {
			BlockTag::Latest => count.latest().await,
			BlockTag::Pending => count.pending().await,
		};
		count.map_err(|e| ClientError::Network(format!("Failed to get transaction count: {}", e)))
	}

	async fn get_transaction(&self, hash: TxHash) -> Result<Transaction, ClientError> {
		match self.provider.get_transaction_by_hash(hash).await {
			Ok(Some(tx)) => convert_transaction(&tx),
			Ok(None) => Err(ClientError::NotFound(format!("Transaction {} not found", hash))),
			Err(e) => Err(ClientError::Network(format!("Failed to get transaction: {}", e))),
		}
	}

	async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ClientError> {
		let tx = self.transaction_request(request)?;
		self.provider
			.estimate_gas(&tx)
			.await
			.map_err(|e| ClientError::Rejected(format!("Failed to estimate gas: {}", e)))
	}

	async fn send_transaction(
		&self,
		request: CallRequest,
	) -> Result<PendingTransaction, ClientError> {
		let tx = self.transaction_request(&request)?;

		// The wallet filler signs; nonce and gas are already set by the caller.
		let pending_tx = self
			.provider
			.send_transaction(tx)
			.await
			.map_err(|e| ClientError::Rejected(format!("Failed to send transaction: {}", e)))?;

		let hash = *pending_tx.tx_hash();
		tracing::info!(
			tx_hash = %with_0x_prefix(&hex::encode(hash.0)),
			chain_id = self.chain_id,
			"Submitted transaction"
		);

		let provider = self.provider.clone();
		let poll_interval = self.poll_interval;
		Ok(PendingTransaction::new(hash, async move {
			wait_for_receipt(provider, hash, poll_interval).await
		}))
	}

	async fn call(&self, request: &CallRequest) -> Result<Bytes, ClientError> {
		let tx = self.transaction_request(request)?;
		self.provider
			.call(&tx)
			.await
			.map_err(|e| ClientError::Network(format!("Failed to call contract: {}", e)))
	}
}

async fn wait_for_receipt(
	provider: DynProvider,
	hash: TxHash,
	poll_interval: Duration,
) -> Result<TransactionReceipt, ClientError> {
	loop {
		match provider.get_transaction_receipt(hash).await {
			Ok(Some(receipt)) => return convert_receipt(&receipt),
			Ok(None) => {
				tracing::trace!(tx_hash = %hash, "Transaction not yet mined");
				tokio::time::sleep(poll_interval).await;
			}
			Err(e) => {
				return Err(ClientError::Network(format!("Failed to get receipt: {}", e)));
			}
		}
	}
}

fn convert_transaction(tx: &RpcTransaction) -> Result<Transaction, ClientError> {
	Ok(Transaction {
		hash: *tx.inner.tx_hash(),
		from: tx.from,
		to: tx.to(),
		nonce: tx.nonce(),
		value: Wei(tx.value()),
		gas_limit: tx.gas_limit(),
		gas_price: tx.gas_price().map(Wei::from),
		input: tx.input().clone(),
		block_number: tx.block_number,
	})
}

fn convert_receipt(receipt: &RpcReceipt) -> Result<TransactionReceipt, ClientError> {
	let gas_used = u64::try_from(receipt.gas_used)
		.map_err(|e| ClientError::InvalidInput(format!("Gas used out of range: {}", e)))?;

	let logs = receipt
		.inner
		.logs()
		.iter()
		.map(|log| LogEntry {
			address: log.address(),
			topics: log.topics().to_vec(),
			data: log.data().data.clone(),
		})
		.collect();

	Ok(TransactionReceipt {
		hash: receipt.transaction_hash,
		block_number: receipt.block_number.unwrap_or(0),
		status: receipt.status(),
		gas_used,
		effective_gas_price: Some(Wei::from(receipt.effective_gas_price)),
		contract_address: receipt.contract_address,
		logs,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use exec_types::{TransactionOptions, U256};

	const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn network() -> NetworkConfig {
		NetworkConfig {
			chain_id: 31337,
			rpc_url: "http://localhost:8545".to_string(),
			receipt_poll_interval_ms: 250,
		}
	}

	#[test]
	fn test_create_client_derives_sender() {
		let client = create_client(&network(), &SecretString::from(ANVIL_KEY)).unwrap();
		assert_eq!(client.chain_id(), 31337);
		assert_eq!(
			client.default_sender(),
			Some(crate::implementations::mock::MOCK_SENDER)
		);
		assert_eq!(client.poll_interval, Duration::from_millis(250));
	}

	#[test]
	fn test_invalid_key_and_url() {
		assert!(matches!(
			create_client(&network(), &SecretString::from("not-a-key")),
			Err(ClientError::InvalidInput(_))
		));

		let mut bad = network();
		bad.rpc_url = "not a url".to_string();
		assert!(matches!(
			create_client(&bad, &SecretString::from(ANVIL_KEY)),
			Err(ClientError::InvalidInput(_))
		));
	}

	#[test]
	fn test_transaction_request_carries_options() {
		let client = create_client(&network(), &SecretString::from(ANVIL_KEY)).unwrap();
		let to = Address::repeat_byte(0x44);
		let request = CallRequest::new(
			Some(to),
			Bytes::from_static(&[0xaa]),
			TransactionOptions {
				gas: Some(50_000),
				gas_price: Some(Wei::from(7u64)),
				value: Some(Wei::from(3u64)),
				nonce: Some(9),
				..Default::default()
			},
		);

		let tx = client.transaction_request(&request).unwrap();
		assert_eq!(tx.from, Some(client.sender));
		assert_eq!(tx.gas, Some(50_000));
		assert_eq!(tx.gas_price, Some(7));
		assert_eq!(tx.value, Some(U256::from(3)));
		assert_eq!(tx.nonce, Some(9));
	}
}
