//! In-memory chain provider for tests.

use crate::chain::{ChainProvider, SubmittedTransaction};
use crate::error::ConnectorError;
use crate::fetcher::{selectors, IERC20Metadata};
use crate::nonce::{NonceManager, NonceSource};
use crate::types::{Address, Token, U256};
use alloy::primitives::{keccak256, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolValue};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct StaticNonce(u64);

#[async_trait]
impl NonceSource for StaticNonce {
    async fn pending_nonce(&self, _address: Address) -> Result<u64, ConnectorError> {
        Ok(self.0)
    }
}

/// A chain that answers `getReserves` and `decimals` from memory and records
/// every call and submitted transaction.
pub struct MockChain {
    chain_id: u64,
    tokens: Vec<Token>,
    stored: RwLock<Vec<Token>>,
    ready: AtomicBool,
    inits: AtomicUsize,
    reserves: RwLock<HashMap<Address, (U256, U256)>>,
    calls: Mutex<Vec<TransactionRequest>>,
    sent: Mutex<Vec<TransactionRequest>>,
    reject_sends: AtomicBool,
    nonce_manager: NonceManager,
}

impl MockChain {
    /// A chain with the given token list and a pending nonce of zero for
    /// every address.
    pub fn new(chain_id: u64, tokens: Vec<Token>) -> Self {
        Self::with_start_nonce(chain_id, tokens, 0)
    }

    pub fn with_start_nonce(chain_id: u64, tokens: Vec<Token>, nonce: u64) -> Self {
        Self {
            chain_id,
            tokens,
            stored: RwLock::new(Vec::new()),
            ready: AtomicBool::new(false),
            inits: AtomicUsize::new(0),
            reserves: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            reject_sends: AtomicBool::new(false),
            nonce_manager: NonceManager::new(Arc::new(StaticNonce(nonce))),
        }
    }

    /// Set the reserves reported by the pair contract at `pair`, in token0
    /// order.
    pub fn with_reserves(self, pair: Address, reserve0: U256, reserve1: U256) -> Self {
        self.set_reserves(pair, reserve0, reserve1);
        self
    }

    pub fn set_reserves(&self, pair: Address, reserve0: U256, reserve1: U256) {
        self.reserves.write().insert(pair, (reserve0, reserve1));
    }

    /// Make every following `send_transaction` fail.
    pub fn reject_sends(&self, reject: bool) {
        self.reject_sends.store(reject, Ordering::SeqCst);
    }

    /// Number of times `init` ran.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    /// Contracts read with `getReserves`, in call order.
    pub fn reserve_reads(&self) -> Vec<Address> {
        self.calls
            .lock()
            .iter()
            .filter(|tx| selector(tx) == Some(selectors::GET_RESERVES))
            .filter_map(target)
            .collect()
    }

    /// Transactions submitted so far.
    /// Number of `eth_call`s served so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().clone()
    }
}

fn target(tx: &TransactionRequest) -> Option<Address> {
    tx.to.and_then(|kind| kind.to().copied())
}

fn selector(tx: &TransactionRequest) -> Option<[u8; 4]> {
    let input = tx.input.input()?;
    input.get(..4)?.try_into().ok()
}

#[async_trait]
impl ChainProvider for MockChain {
    fn chain(&self) -> &str {
        "kava"
    }

    fn network(&self) -> &str {
        "mainnet"
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn init(&self) -> Result<(), ConnectorError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        *self.stored.write() = self.tokens.clone();
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stored_token_list(&self) -> Vec<Token> {
        self.stored.read().clone()
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ConnectorError> {
        Ok(self.nonce_manager.peek(address).await.unwrap_or_default())
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ConnectorError> {
        self.calls.lock().push(tx.clone());
        let Some(to) = target(&tx) else {
            return Ok(Bytes::new());
        };

        // Unknown contracts answer with empty return data, like an EOA
        let data = match selector(&tx) {
            Some(s) if s == selectors::GET_RESERVES => self
                .reserves
                .read()
                .get(&to)
                .map(|(r0, r1)| (*r0, *r1, 0u32).abi_encode()),
            Some(s) if s == selectors::DECIMALS => self
                .tokens
                .iter()
                .find(|t| t.address == to)
                .map(|t| IERC20Metadata::decimalsCall::abi_encode_returns(&t.decimals)),
            _ => None,
        };
        Ok(data.map(Bytes::from).unwrap_or_default())
    }

    async fn send_transaction(
        &self,
        wallet: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> Result<SubmittedTransaction, ConnectorError> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(TransportErrorKind::custom_str("transaction rejected").into());
        }
        let hash = keccak256(tx.nonce.unwrap_or_default().to_be_bytes());
        self.sent.lock().push(tx.clone());
        Ok(SubmittedTransaction::from_request(hash, wallet.address(), &tx))
    }

    fn nonce_manager(&self) -> &NonceManager {
        &self.nonce_manager
    }
}
