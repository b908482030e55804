//! Scripted chain client for tests.
//!
//! Responses are configured per target address and every call is recorded,
//! including the moment each receipt is delivered, so tests can assert on
//! ordering as well as on arguments.

use crate::{ChainClient, ClientError, PendingTransaction};
use async_trait::async_trait;
use exec_types::{
	Address, BlockTag, Bytes, CallRequest, LogEntry, Transaction, TransactionReceipt, TxHash, Wei,
	B256,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Default sender of the mock (first anvil development account).
pub const MOCK_SENDER: Address = Address::new([
	0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
	0xff, 0xb9, 0x22, 0x66,
]);

const DEFAULT_GAS_UNITS: u64 = 21_000;

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
	GasPrice,
	TransactionCount { address: Address, tag: BlockTag },
	GetTransaction(TxHash),
	EstimateGas(CallRequest),
	Send(CallRequest),
	/// A receipt was handed back to the caller.
	Mined(TxHash),
	Call(CallRequest),
}

#[derive(Default)]
struct Script {
	estimates: HashMap<Option<Address>, Result<u64, ClientError>>,
	gas_used: HashMap<Option<Address>, u64>,
	reverts: HashMap<Option<Address>, bool>,
	logs: HashMap<Option<Address>, Vec<LogEntry>>,
	send_failures: HashMap<Option<Address>, ClientError>,
	receipt_failures: HashMap<Option<Address>, ClientError>,
	call_responses: HashMap<Address, Bytes>,
	gas_price_failure: Option<ClientError>,
	nonce_failure: Option<ClientError>,
}

#[derive(Default)]
struct State {
	calls: Vec<MockCall>,
	transactions: HashMap<TxHash, Transaction>,
	sent: u64,
}

/// In-memory [`ChainClient`] with scripted responses.
pub struct MockChainClient {
	chain_id: u64,
	sender: Option<Address>,
	gas_price: Wei,
	nonce: u64,
	script: Script,
	state: Arc<Mutex<State>>,
}

impl Default for MockChainClient {
	fn default() -> Self {
		Self::new()
	}
}

impl MockChainClient {
	pub fn new() -> Self {
		Self {
			chain_id: 31337,
			sender: Some(MOCK_SENDER),
			gas_price: Wei::from(1_000_000_000u64),
			nonce: 0,
			script: Script::default(),
			state: Arc::new(Mutex::new(State::default())),
		}
	}

	pub fn with_gas_price(mut self, gas_price: Wei) -> Self {
		self.gas_price = gas_price;
		self
	}

	/// Pending transaction count reported for every address.
	pub fn with_nonce(mut self, nonce: u64) -> Self {
		self.nonce = nonce;
		self
	}

	pub fn without_sender(mut self) -> Self {
		self.sender = None;
		self
	}

	pub fn with_estimate(mut self, to: Address, units: u64) -> Self {
		self.script.estimates.insert(Some(to), Ok(units));
		self
	}

	pub fn fail_estimate(mut self, to: Address, message: &str) -> Self {
		self.script
			.estimates
			.insert(Some(to), Err(ClientError::Rejected(message.to_string())));
		self
	}

	pub fn with_gas_used(mut self, to: Address, gas_used: u64) -> Self {
		self.script.gas_used.insert(Some(to), gas_used);
		self
	}

	/// Transactions to `to` are mined with `status: false`.
	pub fn revert(mut self, to: Address) -> Self {
		self.script.reverts.insert(Some(to), true);
		self
	}

	pub fn with_logs(mut self, to: Option<Address>, logs: Vec<LogEntry>) -> Self {
		self.script.logs.insert(to, logs);
		self
	}

	pub fn fail_send(mut self, to: Address, error: ClientError) -> Self {
		self.script.send_failures.insert(Some(to), error);
		self
	}

	pub fn fail_receipt(mut self, to: Address, error: ClientError) -> Self {
		self.script.receipt_failures.insert(Some(to), error);
		self
	}

	pub fn fail_gas_price(mut self, error: ClientError) -> Self {
		self.script.gas_price_failure = Some(error);
		self
	}

	/// Pending transaction count lookups fail with `error`.
	pub fn fail_nonce(mut self, error: ClientError) -> Self {
		self.script.nonce_failure = Some(error);
		self
	}

	/// Raw return data for read-only calls to `to`.
	pub fn with_call_response(mut self, to: Address, data: Bytes) -> Self {
		self.script.call_responses.insert(to, data);
		self
	}

	/// Every call observed so far, in order.
	pub fn calls(&self) -> Vec<MockCall> {
		self.state().calls.clone()
	}

	/// Requests passed to `send_transaction`, in order.
	pub fn sent(&self) -> Vec<CallRequest> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				MockCall::Send(request) => Some(request),
				_ => None,
			})
			.collect()
	}

	pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
		self.state().calls.iter().filter(|call| predicate(*call)).count()
	}

	fn state(&self) -> MutexGuard<'_, State> {
		lock(&self.state)
	}

	fn record(&self, call: MockCall) {
		self.state().calls.push(call);
	}
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
	state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChainClient for MockChainClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn default_sender(&self) -> Option<Address> {
		self.sender
	}

	async fn get_gas_price(&self) -> Result<Wei, ClientError> {
		self.record(MockCall::GasPrice);
		match &self.script.gas_price_failure {
			Some(error) => Err(error.clone()),
			None => Ok(self.gas_price),
		}
	}

	async fn get_transaction_count(
		&self,
		address: Address,
		tag: BlockTag,
	) -> Result<u64, ClientError> {
		self.record(MockCall::TransactionCount { address, tag });
		match &self.script.nonce_failure {
			Some(error) => Err(error.clone()),
			None => Ok(self.nonce),
		}
	}

	async fn get_transaction(&self, hash: TxHash) -> Result<Transaction, ClientError> {
		let mut state = self.state();
		state.calls.push(MockCall::GetTransaction(hash));
		state
			.transactions
			.get(&hash)
			.cloned()
			.ok_or_else(|| ClientError::NotFound(format!("transaction {}", hash)))
	}

	async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ClientError> {
		self.record(MockCall::EstimateGas(request.clone()));
		self.script
			.estimates
			.get(&request.to)
			.cloned()
			.unwrap_or(Ok(DEFAULT_GAS_UNITS))
	}

	async fn send_transaction(
		&self,
		request: CallRequest,
	) -> Result<PendingTransaction, ClientError> {
		self.record(MockCall::Send(request.clone()));
		if let Some(error) = self.script.send_failures.get(&request.to) {
			return Err(error.clone());
		}

		let options = &request.options;
		let from = options
			.from
			.or(self.sender)
			.ok_or_else(|| ClientError::InvalidInput("no sender".to_string()))?;
		let nonce = options.nonce.unwrap_or(self.nonce);

		let (hash, block_number) = {
			let mut state = self.state();
			state.sent += 1;
			let hash = B256::left_padding_from(&state.sent.to_be_bytes());
			let block_number = 100 + state.sent;
			state.transactions.insert(
				hash,
				Transaction {
					hash,
					from,
					to: request.to,
					nonce,
					value: options.value.unwrap_or_default(),
					gas_limit: options.gas.unwrap_or(DEFAULT_GAS_UNITS),
					gas_price: options.gas_price,
					input: request.data.clone(),
					block_number: Some(block_number),
				},
			);
			(hash, block_number)
		};

		let receipt = TransactionReceipt {
			hash,
			block_number,
			status: !self.script.reverts.get(&request.to).copied().unwrap_or(false),
			gas_used: self
				.script
				.gas_used
				.get(&request.to)
				.copied()
				.unwrap_or(DEFAULT_GAS_UNITS),
			effective_gas_price: options.gas_price,
			contract_address: request.to.is_none().then(|| from.create(nonce)),
			logs: self.script.logs.get(&request.to).cloned().unwrap_or_default(),
		};
		let failure = self.script.receipt_failures.get(&request.to).cloned();
		let state = self.state.clone();

		Ok(PendingTransaction::new(hash, async move {
			tokio::task::yield_now().await;
			if let Some(error) = failure {
				return Err(error);
			}
			lock(&state).calls.push(MockCall::Mined(hash));
			Ok(receipt)
		}))
	}

	async fn call(&self, request: &CallRequest) -> Result<Bytes, ClientError> {
		self.record(MockCall::Call(request.clone()));
		Ok(request
			.to
			.and_then(|to| self.script.call_responses.get(&to).cloned())
			.unwrap_or_default())
	}
}
