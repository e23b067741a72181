use anyhow::{Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Everything the binary needs, loadable from an optional TOML file with
/// `LOOP_*` environment overrides layered on top (e.g.
/// `LOOP_SESSION__WS_URL`, `LOOP_MARKET__API_KEY`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session: SessionSettings,
    pub server: ServerSettings,
    pub market: MarketApiSettings,
    pub wallet: WalletApiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ws_url: String,
    pub default_strategy: String,
    /// ETH/USD price the borrow total is quoted in. An explicit setting so
    /// the calculator itself stays free of market assumptions.
    pub reference_eth_price: Decimal,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws/strategy".to_string(),
            default_strategy: "eth-usdc-loop".to_string(),
            reference_eth_price: dec!(2000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub rate_limit_per_minute: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            rate_limit_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketApiSettings {
    pub base_url: String,
    pub api_key: String,
}

impl Default for MarketApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://pro-api.coinmarketcap.com".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletApiSettings {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    /// CAIP-2 chain the custodian submits transactions on. Defaults to Base
    /// Sepolia.
    pub caip2: String,
}

impl Default for WalletApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.privy.io".to_string(),
            app_id: String::new(),
            app_secret: String::new(),
            caip2: "eip155:84532".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("LOOP").separator("__"))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.session.ws_url.starts_with("ws://") && !self.session.ws_url.starts_with("wss://") {
            errors.push("session.ws_url must be a ws:// or wss:// URL".to_string());
        }
        if self.session.default_strategy.is_empty() {
            errors.push("session.default_strategy must not be empty".to_string());
        }
        if self.session.reference_eth_price <= Decimal::ZERO {
            errors.push("session.reference_eth_price must be > 0".to_string());
        }
        if self.server.rate_limit_per_minute == 0 {
            errors.push("server.rate_limit_per_minute must be > 0".to_string());
        }
        if self.market.base_url.is_empty() {
            errors.push("market.base_url must not be empty".to_string());
        }
        if self.wallet.base_url.is_empty() {
            errors.push("wallet.base_url must not be empty".to_string());
        }
        if !self.wallet.caip2.contains(':') {
            errors.push("wallet.caip2 must look like \"eip155:<chain id>\"".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
