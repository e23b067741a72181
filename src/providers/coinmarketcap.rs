use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{MarketData, PriceConversionQuery};
use crate::config::MarketApiSettings;

/// CoinMarketCap-compatible market data client. The gateway forwards
/// conversion lookups here and returns the response body untouched.
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CoinMarketCapClient {
    pub fn new(settings: &MarketApiSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }
}

#[async_trait]
impl MarketData for CoinMarketCapClient {
    async fn price_conversion(&self, query: &PriceConversionQuery) -> Result<Value> {
        let url = format!("{}/v2/tools/price-conversion", self.base_url);
        let params = query.as_params();
        debug!("Price conversion lookup: {:?}", params);

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(anyhow!(
                "Price conversion failed ({}): {}",
                status,
                error_text
            ));
        }

        Ok(resp.json().await?)
    }
}
