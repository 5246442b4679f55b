//! Connector instances keyed by (chain, network).

use crate::chain::{ChainProvider, ChainSet};
use crate::config::{GamutConfig, GatewayConfig};
use crate::connector::Uniswapish;
use crate::error::ConnectorError;
use crate::gamut::Gamut;
use crate::swap::gamut_router_abi;
use alloy::json_abi::JsonAbi;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owns the connector instances of a gateway.
///
/// Built once at startup and shared with request handlers. At most one
/// instance exists per (chain, network); repeated lookups return the same
/// `Arc`.
pub struct ConnectorFactory {
    gamut: GamutConfig,
    chains: ChainSet,
    router_abi: Arc<JsonAbi>,
    instances: RwLock<HashMap<(String, String), Arc<Gamut>>>,
}

impl ConnectorFactory {
    pub fn new(config: &GatewayConfig, chains: ChainSet) -> Result<Self, ConnectorError> {
        Ok(Self {
            gamut: config.gamut.clone(),
            chains,
            router_abi: Arc::new(gamut_router_abi()?),
            instances: RwLock::new(HashMap::new()),
        })
    }

    /// The Gamut connector for (chain, network), created on first use.
    pub fn get_instance(&self, chain: &str, network: &str) -> Result<Arc<Gamut>, ConnectorError> {
        let key = (chain.to_string(), network.to_string());
        if let Some(instance) = self.instances.read().get(&key) {
            return Ok(Arc::clone(instance));
        }

        let mut instances = self.instances.write();
        // Another caller may have created it while we waited for the lock
        if let Some(instance) = instances.get(&key) {
            return Ok(Arc::clone(instance));
        }

        if chain != self.gamut.chain {
            return Err(ConnectorError::Config(format!(
                "gamut does not trade on chain {}",
                chain
            )));
        }
        let provider = self.chain(chain, network)?;
        let instance = Arc::new(Gamut::new(
            provider,
            network,
            &self.gamut,
            Arc::clone(&self.router_abi),
        )?);
        debug!(chain, network, "created gamut connector");

        instances.insert(key, Arc::clone(&instance));
        Ok(instance)
    }

    /// A connector by name for (chain, network).
    pub fn connector(
        &self,
        name: &str,
        chain: &str,
        network: &str,
    ) -> Result<Arc<dyn Uniswapish>, ConnectorError> {
        match name {
            "gamut" => Ok(self.get_instance(chain, network)?),
            other => Err(ConnectorError::Config(format!(
                "connector {} is listed but has no trading support",
                other
            ))),
        }
    }

    /// The chain provider for (chain, network).
    pub fn chain(&self, chain: &str, network: &str) -> Result<Arc<dyn ChainProvider>, ConnectorError> {
        self.chains.get(chain, network).ok_or_else(|| {
            ConnectorError::Config(format!("network {}/{} is not configured", chain, network))
        })
    }
}

impl std::fmt::Debug for ConnectorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorFactory")
            .field("chains", &self.chains.len())
            .field("instances", &self.instances.read().len())
            .finish()
    }
}
