//! Per-address nonce sequencing for transaction submission.

use crate::error::ConnectorError;
use crate::types::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Source of the on-chain starting nonce for an address.
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Transaction count of `address`, including pending transactions.
    async fn pending_nonce(&self, address: Address) -> Result<u64, ConnectorError>;
}

/// Serializes transaction submissions per wallet address.
///
/// Each address has its own async lock, held for the whole submission so two
/// trades from the same wallet never race for a nonce. The local counter only
/// advances when a submission succeeds.
pub struct NonceManager {
    source: Arc<dyn NonceSource>,
    /// Next nonce per address, `None` until first fetched from the source.
    slots: Mutex<HashMap<Address, Arc<tokio::sync::Mutex<Option<u64>>>>>,
}

impl NonceManager {
    /// Create a nonce manager backed by the given source.
    pub fn new(source: Arc<dyn NonceSource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, address: Address) -> Arc<tokio::sync::Mutex<Option<u64>>> {
        self.slots.lock().entry(address).or_default().clone()
    }

    /// Run `submit` with the nonce to use for `address`.
    ///
    /// An explicit `nonce` is used as given without consulting the source;
    /// otherwise the next local nonce is used, initialized from the source on
    /// first use. On success a known local nonce moves past the one used; on
    /// failure it is left untouched.
    pub async fn provide_nonce<F, Fut, T>(
        &self,
        nonce: Option<u64>,
        address: Address,
        submit: F,
    ) -> Result<T, ConnectorError>
    where
        F: FnOnce(u64) -> Fut + Send,
        Fut: Future<Output = Result<T, ConnectorError>> + Send,
        T: Send,
    {
        let slot = self.slot(address);
        let mut next = slot.lock().await;

        let use_nonce = match (nonce, *next) {
            (Some(explicit), _) => explicit,
            (None, Some(current)) => current,
            (None, None) => self.source.pending_nonce(address).await?,
        };
        debug!(%address, nonce = use_nonce, "providing nonce");

        let result = submit(use_nonce).await?;

        let after = use_nonce.saturating_add(1);
        *next = match (*next, nonce) {
            (Some(current), _) => Some(current.max(after)),
            (None, None) => Some(after),
            // Unknown until the source is consulted by an automatic submission
            (None, Some(_)) => None,
        };
        Ok(result)
    }

    /// The nonce the next automatic submission for `address` will use, if
    /// known locally.
    pub async fn peek(&self, address: Address) -> Option<u64> {
        *self.slot(address).lock().await
    }
}

impl std::fmt::Debug for NonceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceManager")
            .field("addresses", &self.slots.lock().len())
            .finish()
    }
}
