pub mod coinmarketcap;
pub mod privy;

pub use coinmarketcap::*;
pub use privy::*;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Query string accepted by the price-conversion endpoint and forwarded
/// upstream as-is. Everything stays a string because the gateway does not
/// interpret these values, it only checks that the required ones are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceConversionQuery {
    pub amount: Option<String>,
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub time: Option<String>,
    pub convert: Option<String>,
    pub convert_id: Option<String>,
}

impl PriceConversionQuery {
    /// The upstream needs an amount plus at least one asset identifier.
    pub fn validate(&self) -> Result<(), &'static str> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let has_asset = present(&self.id) || present(&self.symbol);
        if present(&self.amount) && has_asset {
            Ok(())
        } else {
            Err("Missing required parameters")
        }
    }

    pub fn as_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |key: &'static str, value: &Option<String>| {
            if let Some(v) = value.as_deref().filter(|s| !s.is_empty()) {
                params.push((key, v.to_string()));
            }
        };
        push("amount", &self.amount);
        push("id", &self.id);
        push("symbol", &self.symbol);
        push("time", &self.time);
        push("convert", &self.convert);
        push("convert_id", &self.convert_id);
        params
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn price_conversion(&self, query: &PriceConversionQuery) -> anyhow::Result<Value>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletCustodian: Send + Sync {
    async fn create_wallet(&self) -> anyhow::Result<Value>;
    async fn sign_message(&self, wallet_id: &str, message: &str) -> anyhow::Result<Value>;
    async fn send_transaction(
        &self,
        wallet_id: &str,
        recipient: &str,
        amount: &str,
    ) -> anyhow::Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(amount: Option<&str>, id: Option<&str>, symbol: Option<&str>) -> PriceConversionQuery {
        PriceConversionQuery {
            amount: amount.map(String::from),
            id: id.map(String::from),
            symbol: symbol.map(String::from),
            ..PriceConversionQuery::default()
        }
    }

    #[test]
    fn test_amount_plus_id_or_symbol_required() {
        assert!(query(Some("1.5"), Some("1027"), None).validate().is_ok());
        assert!(query(Some("1.5"), None, Some("ETH")).validate().is_ok());
        assert!(query(None, Some("1027"), None).validate().is_err());
        assert!(query(Some("1.5"), None, None).validate().is_err());
        assert!(query(Some(""), None, Some("ETH")).validate().is_err());
        assert!(query(Some("1.5"), Some(""), Some("")).validate().is_err());
    }

    #[test]
    fn test_only_present_params_forwarded() {
        let q = PriceConversionQuery {
            amount: Some("2".to_string()),
            symbol: Some("ETH".to_string()),
            convert: Some("USD".to_string()),
            ..PriceConversionQuery::default()
        };
        let params = q.as_params();
        assert_eq!(
            params,
            vec![
                ("amount", "2".to_string()),
                ("symbol", "ETH".to_string()),
                ("convert", "USD".to_string()),
            ]
        );
    }
}
