//! Chain providers: RPC access, stored token lists and nonce management.

use crate::config::{GatewayConfig, NetworkConfig};
use crate::error::ConnectorError;
use crate::nonce::{NonceManager, NonceSource};
use crate::types::{Address, Token, U256};
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip1559::Eip1559Estimation;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Descriptor of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl SubmittedTransaction {
    /// Describe `tx` as sent by `from` under `hash`.
    pub fn from_request(hash: TxHash, from: Address, tx: &TransactionRequest) -> Self {
        Self {
            hash,
            from,
            to: tx.to.and_then(|kind| kind.to().copied()),
            nonce: tx.nonce.unwrap_or_default(),
            value: tx.value.unwrap_or_default(),
            data: tx.input.input().cloned().unwrap_or_default(),
            gas_limit: tx.gas,
            gas_price: tx.gas_price,
            max_fee_per_gas: tx.max_fee_per_gas,
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        }
    }

    /// Describe a signed transaction exactly as it goes on the wire.
    pub fn from_envelope(from: Address, envelope: &TxEnvelope) -> Self {
        Self {
            hash: *envelope.tx_hash(),
            from,
            to: Transaction::to(envelope),
            nonce: envelope.nonce(),
            value: envelope.value(),
            data: envelope.input().clone(),
            gas_limit: Some(envelope.gas_limit()),
            gas_price: envelope.gas_price(),
            max_fee_per_gas: envelope
                .is_dynamic_fee()
                .then(|| envelope.max_fee_per_gas()),
            max_priority_fee_per_gas: envelope.max_priority_fee_per_gas(),
        }
    }
}

/// Complete a partially specified fee-market pair from a network estimate.
///
/// Supplied values are kept. A filled-in tip never exceeds the supplied cap and
/// a filled-in cap never falls below the supplied tip.
pub fn fill_fee_caps(
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
    estimate: Eip1559Estimation,
) -> (u128, u128) {
    match (max_fee_per_gas, max_priority_fee_per_gas) {
        (Some(max_fee), Some(tip)) => (max_fee, tip),
        (Some(max_fee), None) => (max_fee, estimate.max_priority_fee_per_gas.min(max_fee)),
        (None, Some(tip)) => (estimate.max_fee_per_gas.max(tip), tip),
        (None, None) => (estimate.max_fee_per_gas, estimate.max_priority_fee_per_gas),
    }
}

/// What a connector needs from the chain it trades on.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Chain name, e.g. `kava`.
    fn chain(&self) -> &str;

    /// Network name, e.g. `mainnet`.
    fn network(&self) -> &str;

    /// EIP-155 chain id.
    fn chain_id(&self) -> u64;

    /// Whether `init` has completed.
    fn ready(&self) -> bool;

    /// Connect and load the token list.
    async fn init(&self) -> Result<(), ConnectorError>;

    /// The tokens known to this chain.
    fn stored_token_list(&self) -> Vec<Token>;

    /// Look up a token by symbol (case-insensitive).
    fn get_token_for_symbol(&self, symbol: &str) -> Option<Token> {
        self.stored_token_list()
            .into_iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Transaction count of `address`, including pending transactions.
    async fn transaction_count(&self, address: Address) -> Result<u64, ConnectorError>;

    /// Execute a read-only call (`eth_call`).
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ConnectorError>;

    /// Sign `tx` with `wallet` and broadcast it.
    async fn send_transaction(
        &self,
        wallet: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> Result<SubmittedTransaction, ConnectorError>;

    /// Nonce sequencing for wallets on this chain.
    fn nonce_manager(&self) -> &NonceManager;
}

#[async_trait]
impl NonceSource for DynProvider {
    async fn pending_nonce(&self, address: Address) -> Result<u64, ConnectorError> {
        Ok(self.get_transaction_count(address).pending().await?)
    }
}

/// An EVM chain reached over JSON-RPC.
pub struct EvmChain {
    chain: String,
    network: String,
    chain_id: u64,
    provider: DynProvider,
    configured_tokens: Vec<Token>,
    tokens: RwLock<Vec<Token>>,
    nonce_manager: NonceManager,
    ready: AtomicBool,
}

impl EvmChain {
    /// Create a chain handle. No RPC request is made until `init`.
    pub fn new(chain: &str, network: &str, config: &NetworkConfig) -> Result<Self, ConnectorError> {
        let rpc_url: Url = config.node_url.parse().map_err(|e| {
            ConnectorError::Config(format!(
                "invalid node url for {}/{}: {}",
                chain, network, e
            ))
        })?;
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();

        Ok(Self {
            chain: chain.to_string(),
            network: network.to_string(),
            chain_id: config.chain_id,
            nonce_manager: NonceManager::new(Arc::new(provider.clone())),
            provider,
            configured_tokens: config.tokens.clone(),
            tokens: RwLock::new(Vec::new()),
            ready: AtomicBool::new(false),
        })
    }

    /// The underlying RPC handle.
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Fill in what `tx` leaves unset so it can be signed locally.
    async fn complete_request(
        &self,
        mut tx: TransactionRequest,
        from: Address,
    ) -> Result<TransactionRequest, ConnectorError> {
        tx.from = Some(from);
        tx.chain_id = Some(self.chain_id);
        if tx.nonce.is_none() {
            tx.nonce = Some(NonceSource::pending_nonce(&self.provider, from).await?);
        }
        if tx.gas.is_none() {
            tx.gas = Some(self.provider.estimate_gas(tx.clone()).await?);
        }

        let fee_market_complete =
            tx.max_fee_per_gas.is_some() && tx.max_priority_fee_per_gas.is_some();
        if tx.gas_price.is_none() && !fee_market_complete {
            let estimate = self.provider.estimate_eip1559_fees().await?;
            let (max_fee, tip) =
                fill_fee_caps(tx.max_fee_per_gas, tx.max_priority_fee_per_gas, estimate);
            debug!(max_fee, tip, "completed fee-market fields");
            tx.max_fee_per_gas = Some(max_fee);
            tx.max_priority_fee_per_gas = Some(tip);
        }
        Ok(tx)
    }
}

#[async_trait]
impl ChainProvider for EvmChain {
    fn chain(&self) -> &str {
        &self.chain
    }

    fn network(&self) -> &str {
        &self.network
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn init(&self) -> Result<(), ConnectorError> {
        let remote_chain_id = self.provider.get_chain_id().await?;
        if remote_chain_id != self.chain_id {
            return Err(ConnectorError::Config(format!(
                "{}/{} node reports chain id {} but {} is configured",
                self.chain, self.network, remote_chain_id, self.chain_id
            )));
        }

        let tokens: Vec<Token> = self
            .configured_tokens
            .iter()
            .filter(|t| t.chain_id == self.chain_id)
            .cloned()
            .collect();
        info!(
            chain = %self.chain,
            network = %self.network,
            tokens = tokens.len(),
            "chain initialized"
        );
        *self.tokens.write() = tokens;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn stored_token_list(&self) -> Vec<Token> {
        self.tokens.read().clone()
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ConnectorError> {
        NonceSource::pending_nonce(&self.provider, address).await
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ConnectorError> {
        Ok(self.provider.call(tx).await?)
    }

    async fn send_transaction(
        &self,
        wallet: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> Result<SubmittedTransaction, ConnectorError> {
        let from = wallet.address();
        let tx = self.complete_request(tx, from).await?;
        let envelope = tx.build(&EthereumWallet::from(wallet.clone())).await?;

        let submitted = SubmittedTransaction::from_envelope(from, &envelope);
        self.provider.send_tx_envelope(envelope).await?;
        debug!(hash = %submitted.hash, %from, "transaction broadcast");

        Ok(submitted)
    }

    fn nonce_manager(&self) -> &NonceManager {
        &self.nonce_manager
    }
}

/// Chain providers keyed by (chain, network).
#[derive(Clone, Default)]
pub struct ChainSet {
    chains: HashMap<(String, String), Arc<dyn ChainProvider>>,
}

impl ChainSet {
    /// Create an EVM chain handle for every configured network.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConnectorError> {
        let mut set = Self::default();
        for (chain, chain_config) in &config.chains {
            for (network, network_config) in &chain_config.networks {
                let provider = EvmChain::new(chain, network, network_config)?;
                set = set.with_chain(chain, network, Arc::new(provider));
            }
        }
        Ok(set)
    }

    /// Add or replace the provider for (chain, network).
    pub fn with_chain(mut self, chain: &str, network: &str, provider: Arc<dyn ChainProvider>) -> Self {
        self.chains
            .insert((chain.to_string(), network.to_string()), provider);
        self
    }

    /// Get the provider for (chain, network).
    pub fn get(&self, chain: &str, network: &str) -> Option<Arc<dyn ChainProvider>> {
        self.chains
            .get(&(chain.to_string(), network.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
