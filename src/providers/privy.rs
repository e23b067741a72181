use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::WalletCustodian;
use crate::config::WalletApiSettings;

/// Privy-compatible custodial wallet client. The gateway never touches key
/// material; wallet creation, signing, and sends all happen provider-side.
#[derive(Debug, Clone)]
pub struct PrivyClient {
    client: Client,
    base_url: String,
    app_id: String,
    app_secret: String,
    caip2: String,
    chain_id: Option<u64>,
}

impl PrivyClient {
    pub fn new(settings: &WalletApiSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            app_id: settings.app_id.clone(),
            app_secret: settings.app_secret.clone(),
            caip2: settings.caip2.clone(),
            chain_id: parse_chain_id(&settings.caip2),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Wallet provider request: POST {}", path);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.app_id, Some(&self.app_secret))
            .header("privy-app-id", &self.app_id)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await?;
            return Err(anyhow!(
                "Wallet provider request failed ({}): {}",
                status,
                error_text
            ));
        }

        Ok(resp.json().await?)
    }
}

fn parse_chain_id(caip2: &str) -> Option<u64> {
    caip2.split(':').nth(1).and_then(|part| part.parse().ok())
}

#[async_trait]
impl WalletCustodian for PrivyClient {
    async fn create_wallet(&self) -> Result<Value> {
        self.post("/v1/wallets", json!({"chain_type": "ethereum"}))
            .await
    }

    async fn sign_message(&self, wallet_id: &str, message: &str) -> Result<Value> {
        self.post(
            &format!("/v1/wallets/{}/rpc", wallet_id),
            json!({
                "method": "personal_sign",
                "params": {"message": message, "encoding": "utf-8"},
            }),
        )
        .await
    }

    async fn send_transaction(&self, wallet_id: &str, recipient: &str, amount: &str) -> Result<Value> {
        let mut transaction = json!({"to": recipient, "value": amount});
        if let Some(chain_id) = self.chain_id {
            transaction["chain_id"] = json!(chain_id);
        }
        self.post(
            &format!("/v1/wallets/{}/rpc", wallet_id),
            json!({
                "method": "eth_sendTransaction",
                "caip2": self.caip2,
                "params": {"transaction": transaction},
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_parsed_from_caip2() {
        assert_eq!(parse_chain_id("eip155:84532"), Some(84532));
        assert_eq!(parse_chain_id("eip155:1"), Some(1));
        assert_eq!(parse_chain_id("eip155:"), None);
        assert_eq!(parse_chain_id("base-sepolia"), None);
    }
}
