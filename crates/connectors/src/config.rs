//! Gateway configuration: chains, connector settings and the catalog's
//! network listings.
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `GATEWAY_`-prefixed environment variables (`__` separates nesting, e.g.
//! `GATEWAY_GAMUT__ALLOWED_SLIPPAGE=2/100`).

use crate::catalog::AvailableNetworks;
use crate::error::ConnectorError;
use crate::types::{Address, Percent, Token, B256, NATIVE_TOKEN};
use alloy::primitives::{address, b256};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "GATEWAY_";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    /// EVM chains by name.
    pub chains: BTreeMap<String, ChainConfig>,
    /// Gamut connector settings.
    pub gamut: GamutConfig,
    /// Networks of the listed exchanges that have no connector settings here.
    pub exchanges: BTreeMap<String, ExchangeConfig>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// A chain and its networks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainConfig {
    pub networks: BTreeMap<String, NetworkConfig>,
}

/// RPC endpoint and token list of one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub node_url: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// Networks an exchange is available on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub available_networks: Vec<AvailableNetworks>,
}

/// Settings of the Gamut constant-product connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamutConfig {
    /// Chain the connector trades on.
    pub chain: String,
    /// Default slippage as a fraction string, e.g. `1/100`.
    pub allowed_slippage: String,
    /// Default gas limit for swap transactions.
    pub gas_limit_estimate: u64,
    /// Default time-to-live for swap transactions, in seconds.
    pub ttl: u64,
    /// Swap fee charged by the pools, in basis points (25 = 0.25%).
    pub fee_bps: u32,
    /// Contract addresses per network.
    pub contract_addresses: BTreeMap<String, GamutNetworkConfig>,
}

/// Contract addresses of one Gamut deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamutNetworkConfig {
    pub router_address: Address,
    pub factory_address: Address,
    /// Init code hash of the pair contract, for CREATE2 pair addresses.
    pub init_code_hash: B256,
    /// Wrapped native coin, substituted for the native coin in pair lookups.
    pub wrapped_native: Option<Address>,
    /// Pools whose address does not follow CREATE2 derivation.
    #[serde(default)]
    pub pools: Vec<PoolAddress>,
}

/// A known pool address for a token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAddress {
    pub tokens: [Address; 2],
    pub address: Address,
}

impl PoolAddress {
    /// Whether this pool trades `a` against `b`, in either order.
    pub fn matches(&self, a: Address, b: Address) -> bool {
        (self.tokens[0] == a && self.tokens[1] == b) || (self.tokens[0] == b && self.tokens[1] == a)
    }
}

impl GatewayConfig {
    /// Load configuration from defaults, the TOML file at `path` (if it
    /// exists) and the environment, then validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConnectorError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConnectorError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configuration that would only fail later, per request.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        self.gamut.validate()?;
        if !self.chains.contains_key(&self.gamut.chain) {
            return Err(ConnectorError::Config(format!(
                "gamut trades on chain {} which is not configured",
                self.gamut.chain
            )));
        }
        Ok(())
    }

    /// Get a network's RPC settings.
    pub fn network(&self, chain: &str, network: &str) -> Option<&NetworkConfig> {
        self.chains.get(chain)?.networks.get(network)
    }

    /// Networks an exchange is listed with.
    pub fn available_networks(&self, exchange: &str) -> Vec<AvailableNetworks> {
        if exchange == "gamut" {
            return self.gamut.available_networks();
        }
        self.exchanges
            .get(exchange)
            .map(|e| e.available_networks.clone())
            .unwrap_or_default()
    }

    /// Set the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Replace the Gamut settings.
    pub fn with_gamut(mut self, gamut: GamutConfig) -> Self {
        self.gamut = gamut;
        self
    }
}

impl GamutConfig {
    /// Router address for a network.
    pub fn router_address(&self, network: &str) -> Option<Address> {
        self.contract_addresses.get(network).map(|c| c.router_address)
    }

    /// Parsed default slippage.
    pub fn allowed_slippage(&self) -> Option<Percent> {
        Percent::parse_fraction(&self.allowed_slippage)
    }

    /// Networks with contract addresses.
    pub fn available_networks(&self) -> Vec<AvailableNetworks> {
        vec![AvailableNetworks {
            chain: self.chain.clone(),
            networks: self.contract_addresses.keys().cloned().collect(),
        }]
    }

    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.allowed_slippage().is_none() {
            return Err(ConnectorError::Config(format!(
                "malformed gamut.allowed_slippage {:?}, expected a fraction like 1/100",
                self.allowed_slippage
            )));
        }
        if self.fee_bps >= crate::pair::FEE_DENOMINATOR_BPS {
            return Err(ConnectorError::Config(format!(
                "gamut.fee_bps {} must be below {}",
                self.fee_bps,
                crate::pair::FEE_DENOMINATOR_BPS
            )));
        }
        Ok(())
    }

    /// Set the default slippage.
    pub fn with_allowed_slippage(mut self, allowed_slippage: impl Into<String>) -> Self {
        self.allowed_slippage = allowed_slippage.into();
        self
    }

    /// Set the default ttl.
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the default gas limit.
    pub fn with_gas_limit_estimate(mut self, gas_limit_estimate: u64) -> Self {
        self.gas_limit_estimate = gas_limit_estimate;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 15888 }
    }
}

/// Kava mainnet token list.
pub fn kava_tokens() -> Vec<Token> {
    vec![
        Token::new(2222, NATIVE_TOKEN, 18, "KAVA", "KAVA Coin"),
        Token::new(
            2222,
            address!("332730a4F6E03D9C55829435f10360E13cfA41Ff"),
            18,
            "BUSD",
            "BUSD Coin",
        ),
        Token::new(
            2222,
            address!("c86c7C0eFbd6A49B35E8714C5f59D99De09A225b"),
            18,
            "WKAVA",
            "Wrapped KAVA",
        ),
        Token::new(
            2222,
            address!("fa9343c3897324496a05fc75abed6bac29f8a40f"),
            6,
            "USDC",
            "USD Coin",
        ),
    ]
}

impl Default for GamutConfig {
    fn default() -> Self {
        let pool = |a: Address, b: Address, address: Address| PoolAddress {
            tokens: [a, b],
            address,
        };
        let mainnet = GamutNetworkConfig {
            router_address: address!("923A7273480e73439b73b065d096c58034968504"),
            factory_address: address!("bD4C56E952c238389AEE995E1ed504cA646D199B"),
            init_code_hash: b256!(
                "00fb7f630766e6a796048ea87d01acd3068e8ff67d078148a3fa3f4a84f69bd5"
            ),
            wrapped_native: Some(address!("c86c7C0eFbd6A49B35E8714C5f59D99De09A225b")),
            pools: vec![
                pool(
                    address!("332730a4F6E03D9C55829435f10360E13cfA41Ff"),
                    address!("c86c7C0eFbd6A49B35E8714C5f59D99De09A225b"),
                    address!("6be57618c8832ad25cceadf2745d5c92de7ab7b2"),
                ),
                pool(
                    address!("765277EebeCA2e31912C9946eAe1021199B39C61"),
                    address!("B44a9B6905aF7c801311e8F4E76932ee959c663C"),
                    address!("02Bd2e7f107A15CE8b6414df67F4A7e662218Bc9"),
                ),
                pool(
                    address!("765277EebeCA2e31912C9946eAe1021199B39C61"),
                    address!("818ec0A7Fe18Ff94269904fCED6AE3DaE6d6dC0b"),
                    address!("bd3d481e308A6f2fA6714bA3dc33e68Ab3915557"),
                ),
                pool(
                    address!("765277EebeCA2e31912C9946eAe1021199B39C61"),
                    address!("fA9343C3897324496A05fC75abeD6bAC29f8A40f"),
                    address!("9f065518185436FbDd72FD7ca7fd99CCAF3f061A"),
                ),
                pool(
                    address!("332730a4F6E03D9C55829435f10360E13cfA41Ff"),
                    address!("765277EebeCA2e31912C9946eAe1021199B39C61"),
                    address!("9D102cE615ab35CEdDDa899bE47A8DA5Dc139460"),
                ),
                pool(
                    address!("765277EebeCA2e31912C9946eAe1021199B39C61"),
                    address!("c86c7C0eFbd6A49B35E8714C5f59D99De09A225b"),
                    address!("1e34dd2F920630e6AF04519221ed9004608A6c52"),
                ),
                pool(
                    address!("B44a9B6905aF7c801311e8F4E76932ee959c663C"),
                    address!("E3F5a90F9cb311505cd691a46596599aA1A0AD7D"),
                    address!("Bd87cD1512763EEFC14B3717ff42538022E95C95"),
                ),
                pool(
                    address!("c86c7C0eFbd6A49B35E8714C5f59D99De09A225b"),
                    address!("E3F5a90F9cb311505cd691a46596599aA1A0AD7D"),
                    address!("545236b930E5F5f339934296A5d442014978706F"),
                ),
            ],
        };

        Self {
            chain: "kava".to_string(),
            allowed_slippage: "1/100".to_string(),
            gas_limit_estimate: 300_000,
            ttl: 300,
            fee_bps: 25,
            contract_addresses: BTreeMap::from([("mainnet".to_string(), mainnet)]),
        }
    }
}

fn networks(entries: &[(&str, &[&str])]) -> ExchangeConfig {
    ExchangeConfig {
        available_networks: entries
            .iter()
            .map(|(chain, networks)| AvailableNetworks {
                chain: chain.to_string(),
                networks: networks.iter().map(|n| n.to_string()).collect(),
            })
            .collect(),
    }
}

/// Networks of the exchanges listed by the catalog.
pub fn default_exchanges() -> BTreeMap<String, ExchangeConfig> {
    let mut exchanges = BTreeMap::new();
    let mut add = |name: &str, entries: &[(&str, &[&str])]| {
        exchanges.insert(name.to_string(), networks(entries));
    };

    add(
        "uniswap",
        &[
            ("ethereum", &["mainnet", "goerli", "arbitrum_one", "optimism"]),
            ("polygon", &["mainnet", "mumbai"]),
        ],
    );
    add("pangolin", &[("avalanche", &["avalanche", "fuji"])]);
    add(
        "openocean",
        &[
            ("avalanche", &["avalanche"]),
            ("ethereum", &["mainnet"]),
            ("polygon", &["mainnet"]),
            ("harmony", &["mainnet"]),
            ("binance-smart-chain", &["mainnet"]),
            ("cronos", &["mainnet"]),
        ],
    );
    add("quickswap", &[("polygon", &["mainnet", "mumbai"])]);
    add("perp", &[("ethereum", &["optimism"])]);
    add(
        "sushiswap",
        &[
            ("ethereum", &["mainnet", "goerli"]),
            ("polygon", &["mainnet"]),
            ("binance-smart-chain", &["mainnet", "testnet"]),
            ("avalanche", &["avalanche", "fuji"]),
            ("harmony", &["mainnet"]),
        ],
    );
    add("traderjoe", &[("avalanche", &["avalanche", "fuji"])]);
    add("defikingdoms", &[("harmony", &["mainnet"])]);
    add("defira", &[("harmony", &["mainnet", "testnet"])]);
    add("mad_meerkat", &[("cronos", &["mainnet"])]);
    add("vvs", &[("cronos", &["mainnet"])]);
    add("ref", &[("near", &["mainnet", "testnet"])]);
    add("pancakeswap", &[("binance-smart-chain", &["mainnet", "testnet"])]);
    add("injective", &[("injective", &["mainnet", "testnet"])]);
    add("xsswap", &[("xdc", &["xinfin", "apothem"])]);
    add("dexalot", &[("avalanche", &["avalanche", "fuji"])]);
    add("zigzag", &[("ethereum", &["arbitrum_one"])]);

    exchanges
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let kava = ChainConfig {
            networks: BTreeMap::from([(
                "mainnet".to_string(),
                NetworkConfig {
                    chain_id: 2222,
                    node_url: "https://evm.kava.io".to_string(),
                    tokens: kava_tokens(),
                },
            )]),
        };

        Self {
            server: ServerConfig::default(),
            chains: BTreeMap::from([("kava".to_string(), kava)]),
            gamut: GamutConfig::default(),
            exchanges: default_exchanges(),
        }
    }
}
