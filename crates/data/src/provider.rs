use crate::client::GmxClient;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use gmxlp_core::{Market, PoolStats, Position, Snapshot, SnapshotProvider};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Assembles one immutable [`Snapshot`] per cycle from the GMX stats API.
pub struct GmxSnapshotProvider {
    client: GmxClient,
    wallet_address: Option<String>,
}

impl GmxSnapshotProvider {
    #[must_use]
    pub fn new(client: GmxClient, wallet_address: Option<String>) -> Self {
        Self {
            client,
            wallet_address,
        }
    }
}

#[async_trait]
impl SnapshotProvider for GmxSnapshotProvider {
    async fn snapshot(&self) -> Result<Snapshot> {
        let market_records = self.client.get_markets().await?;
        let apy_records = self.client.get_pool_apys().await?;

        let tvl_by_key: HashMap<String, Decimal> = market_records
            .iter()
            .map(|m| (m.market_token.clone(), m.pool_value_usd))
            .collect();

        let markets: Vec<Market> = market_records
            .into_iter()
            .map(|m| Market {
                market_key: m.market_token,
                name: m.name,
                index_token: m.index_token,
                long_token: m.long_token,
                short_token: m.short_token,
                long_oi: m.long_open_interest_usd,
                short_oi: m.short_open_interest_usd,
            })
            .collect();

        let stats: Vec<PoolStats> = apy_records
            .into_iter()
            .map(|r| PoolStats {
                tvl: tvl_by_key
                    .get(&r.market_token)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
                market_key: r.market_token,
                apy: r.apy,
                volume_24h: r.volume_24h_usd,
                age_days: r.age_days,
                volatility: r.volatility,
            })
            .collect();

        let positions = match &self.wallet_address {
            Some(address) if !address.is_empty() => self
                .client
                .get_gm_balances(address)
                .await?
                .into_iter()
                .map(|b| Position {
                    market_key: b.market_token,
                    name: b.name,
                    entry_value: b.cost_basis_usd,
                    unrealized_pnl: b.value_usd - b.cost_basis_usd,
                    current_value: b.value_usd,
                    entered_at: b.entered_at,
                    realized_pnl: b.realized_pnl_usd,
                })
                .collect(),
            _ => Vec::new(),
        };

        tracing::info!(
            markets = markets.len(),
            pools = stats.len(),
            positions = positions.len(),
            "snapshot assembled"
        );

        Ok(Snapshot {
            markets,
            stats,
            positions,
            taken_at: Utc::now(),
        })
    }
}
