//! The connector listing served to gateway clients.

use crate::config::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of operation a connector supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingType {
    #[serde(rename = "EVM_AMM")]
    EvmAmm,
    #[serde(rename = "EVM_AMM_LP")]
    EvmAmmLp,
    #[serde(rename = "EVM_Perpetual")]
    EvmPerpetual,
    #[serde(rename = "NEAR_AMM")]
    NearAmm,
    #[serde(rename = "CLOB_SPOT")]
    ClobSpot,
    #[serde(rename = "CLOB_PERP")]
    ClobPerp,
}

/// Networks of one chain an exchange is available on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableNetworks {
    pub chain: String,
    pub networks: Vec<String>,
}

/// One entry of the connector listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorDescriptor {
    pub name: String,
    pub trading_type: Vec<TradingType>,
    pub available_networks: Vec<AvailableNetworks>,
    /// Other connectors whose token approvals this one reuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_spenders: Option<Vec<String>>,
    /// Extra questions asked when adding a wallet, by field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_add_wallet_prompts: Option<BTreeMap<String, String>>,
}

/// Body of `GET /connectors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorsResponse {
    pub connectors: Vec<ConnectorDescriptor>,
}

struct Listing {
    name: &'static str,
    /// Key of the exchange's network configuration.
    exchange: &'static str,
    trading_type: TradingType,
    additional_spenders: &'static [&'static str],
    prompt: Option<(&'static str, &'static str)>,
}

const fn listing(name: &'static str, exchange: &'static str, trading_type: TradingType) -> Listing {
    Listing {
        name,
        exchange,
        trading_type,
        additional_spenders: &[],
        prompt: None,
    }
}

const INJECTIVE_PROMPT: (&str, &str) = (
    "accountId",
    "Enter your injective sub account id wallet key (input 0 if unsure) >>> ",
);

const LISTINGS: &[Listing] = &[
    listing("uniswap", "uniswap", TradingType::EvmAmm),
    Listing {
        additional_spenders: &["uniswap"],
        ..listing("uniswapLP", "uniswap", TradingType::EvmAmmLp)
    },
    listing("pangolin", "pangolin", TradingType::EvmAmm),
    listing("openocean", "openocean", TradingType::EvmAmm),
    listing("quickswap", "quickswap", TradingType::EvmAmm),
    listing("perp", "perp", TradingType::EvmPerpetual),
    listing("sushiswap", "sushiswap", TradingType::EvmAmm),
    listing("traderjoe", "traderjoe", TradingType::EvmAmm),
    listing("defikingdoms", "defikingdoms", TradingType::EvmAmm),
    listing("defira", "defira", TradingType::EvmAmm),
    listing("mad_meerkat", "mad_meerkat", TradingType::EvmAmm),
    listing("vvs", "vvs", TradingType::EvmAmm),
    listing("ref", "ref", TradingType::NearAmm),
    listing("pancakeswap", "pancakeswap", TradingType::EvmAmm),
    Listing {
        prompt: Some(INJECTIVE_PROMPT),
        ..listing("injective", "injective", TradingType::ClobSpot)
    },
    Listing {
        prompt: Some(INJECTIVE_PROMPT),
        ..listing("injective_perpetual", "injective", TradingType::ClobPerp)
    },
    listing("xswap", "xsswap", TradingType::EvmAmm),
    Listing {
        prompt: Some((
            "api_key",
            "Enter your Dexalot API Key (you can request one from the Dexalot team) >>> ",
        )),
        ..listing("dexalot", "dexalot", TradingType::ClobSpot)
    },
    listing("zigzag", "zigzag", TradingType::EvmAmm),
    listing("gamut", "gamut", TradingType::EvmAmm),
];

/// Connector descriptors, built once from configuration.
#[derive(Debug, Clone)]
pub struct Catalog {
    connectors: Vec<ConnectorDescriptor>,
}

impl Catalog {
    /// Build the listing. Every entry gets its own copy of its exchange's
    /// networks, also when two entries share an exchange.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let connectors = LISTINGS
            .iter()
            .map(|listing| ConnectorDescriptor {
                name: listing.name.to_string(),
                trading_type: vec![listing.trading_type],
                available_networks: config.available_networks(listing.exchange),
                additional_spenders: (!listing.additional_spenders.is_empty()).then(|| {
                    listing
                        .additional_spenders
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
                additional_add_wallet_prompts: listing.prompt.map(|(field, prompt)| {
                    BTreeMap::from([(field.to_string(), prompt.to_string())])
                }),
            })
            .collect();
        Self { connectors }
    }

    pub fn connectors(&self) -> &[ConnectorDescriptor] {
        &self.connectors
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&ConnectorDescriptor> {
        self.connectors.iter().find(|c| c.name == name)
    }

    pub fn response(&self) -> ConnectorsResponse {
        ConnectorsResponse {
            connectors: self.connectors.clone(),
        }
    }
}
