//! Thin GMX stats API client. Pure transport: the core never sees this
//! crate, only the assembled snapshot.

use anyhow::{Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

pub struct GmxClient {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    pub market_token: String,
    pub name: String,
    pub index_token: String,
    pub long_token: String,
    pub short_token: String,
    #[serde(default)]
    pub long_open_interest_usd: Decimal,
    #[serde(default)]
    pub short_open_interest_usd: Decimal,
    #[serde(default)]
    pub pool_value_usd: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolApyRecord {
    pub market_token: String,
    /// Annualized yield as a fraction.
    pub apy: f64,
    #[serde(default)]
    pub volume_24h_usd: Decimal,
    #[serde(default)]
    pub age_days: u32,
    #[serde(default)]
    pub volatility: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmBalanceRecord {
    pub market_token: String,
    pub name: String,
    pub value_usd: Decimal,
    pub cost_basis_usd: Decimal,
    pub entered_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub realized_pnl_usd: Decimal,
}

impl GmxClient {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
        }
    }

    pub async fn get_markets(&self) -> Result<Vec<MarketRecord>> {
        self.get("/markets").await.context("fetching GM markets")
    }

    pub async fn get_pool_apys(&self) -> Result<Vec<PoolApyRecord>> {
        self.get("/apy").await.context("fetching pool APYs")
    }

    pub async fn get_gm_balances(&self, address: &str) -> Result<Vec<GmBalanceRecord>> {
        self.get(&format!("/account/{address}/gm"))
            .await
            .with_context(|| format!("fetching GM balances for {address}"))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let value = response
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding response from {url}"))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_record_decodes_from_api_shape() {
        let body = r#"{
            "marketToken": "0x70d95587d40A2caf56bd97485aB3Eec10Bee6336",
            "name": "ETH-USDC",
            "indexToken": "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
            "longToken": "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
            "shortToken": "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
            "longOpenInterestUsd": "41250000.5",
            "shortOpenInterestUsd": "39800000.25",
            "poolValueUsd": "52000000"
        }"#;
        let record: MarketRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.name, "ETH-USDC");
        assert!(record.long_open_interest_usd > record.short_open_interest_usd);
    }

    #[test]
    fn missing_optional_fields_default() {
        let body = r#"{
            "marketToken": "0x1",
            "apy": 0.185
        }"#;
        let record: PoolApyRecord = serde_json::from_str(body).unwrap();
        assert!((record.apy - 0.185).abs() < 1e-9);
        assert_eq!(record.age_days, 0);
    }
}
