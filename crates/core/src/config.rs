use crate::error::StrategyError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance for the weight-sum invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub pools: PoolsConfig,
    pub execution: ExecutionConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain: String,
    pub rpc_url: String,
    pub stats_api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub address: String,
}

/// Named weight profile for composite scoring. Profiles are data, not code:
/// any mapping that passes [`WeightProfile::validate`] is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub apy: f64,
    pub risk: f64,
    pub liquidity: f64,
    pub balance: f64,
}

impl WeightProfile {
    /// Checks that weights are non-negative and sum to 1.0 within tolerance.
    ///
    /// # Errors
    /// Returns `StrategyError::Configuration` on a violated invariant.
    pub fn validate(&self, name: &str) -> Result<(), StrategyError> {
        let weights = [self.apy, self.risk, self.liquidity, self.balance];
        if let Some(w) = weights.iter().find(|w| **w < 0.0) {
            return Err(StrategyError::Configuration {
                reason: format!("weight profile `{name}` contains negative weight {w}"),
            });
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(StrategyError::Configuration {
                reason: format!("weight profile `{name}` sums to {sum}, expected 1.0"),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Name of the active weight profile.
    pub profile: String,
    /// Registered profiles. BTreeMap for deterministic iteration.
    pub profiles: BTreeMap<String, WeightProfile>,
    /// Minimum APY (fraction) for a pool to receive new allocation.
    pub min_apy: f64,
    /// Per-pool cap as a fraction of total managed capital, in (0, 1].
    pub max_single_pool_pct: f64,
}

impl StrategyConfig {
    /// Resolves the active weight profile.
    ///
    /// # Errors
    /// Returns `StrategyError::Configuration` if the named profile is not
    /// registered or fails the weight invariants.
    pub fn active_profile(&self) -> Result<WeightProfile, StrategyError> {
        let profile =
            self.profiles
                .get(&self.profile)
                .ok_or_else(|| StrategyError::Configuration {
                    reason: format!("unknown weight profile `{}`", self.profile),
                })?;
        profile.validate(&self.profile)?;
        Ok(*profile)
    }

    /// Validates the numeric bounds the planner depends on.
    ///
    /// # Errors
    /// Returns `StrategyError::Configuration` when a percentage falls
    /// outside (0, 1].
    pub fn validate(&self) -> Result<(), StrategyError> {
        self.active_profile()?;
        check_fraction("strategy.min_apy", self.min_apy, false)?;
        check_fraction("strategy.max_single_pool_pct", self.max_single_pool_pct, true)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Portfolio-level cap on total managed value, USD. Must be > 0.
    pub max_position_usd: Decimal,
    /// Open/Increase signals below this amount are suppressed as dust.
    pub min_position_usd: Decimal,
    /// Drawdown fraction that raises a warning, in (0, 1].
    pub max_drawdown_pct: f64,
    /// Drawdown fraction that triggers stop-loss, in (0, 1].
    pub stop_loss_pct: f64,
    /// Open interest imbalance tolerance (0 = balanced, 1 = one-sided).
    pub max_imbalance: f64,
}

impl RiskConfig {
    /// Validates the monitor thresholds.
    ///
    /// # Errors
    /// Returns `StrategyError::Configuration` on a non-positive cap or a
    /// percentage outside (0, 1].
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.max_position_usd <= Decimal::ZERO {
            return Err(StrategyError::Configuration {
                reason: format!(
                    "risk.max_position_usd must be > 0, got {}",
                    self.max_position_usd
                ),
            });
        }
        check_fraction("risk.max_drawdown_pct", self.max_drawdown_pct, true)?;
        check_fraction("risk.stop_loss_pct", self.stop_loss_pct, true)?;
        check_fraction("risk.max_imbalance", self.max_imbalance, true)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PoolsConfig {
    /// Only pools named here are eligible. Empty means all pools.
    pub whitelist: Vec<String>,
    /// Pools named here are never allocated to; held positions get closed.
    pub blacklist: Vec<String>,
}

impl PoolsConfig {
    /// Whether a pool passes the whitelist/blacklist filter.
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        if self.blacklist.iter().any(|n| n == name) {
            return false;
        }
        self.whitelist.is_empty() || self.whitelist.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Seconds between evaluation cycles.
    pub check_interval_secs: u64,
    pub slippage_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub telegram: TelegramConfig,
    /// Seconds an identical (market, category, severity) alert is suppressed.
    pub throttle_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
}

fn check_fraction(name: &str, value: f64, strictly_positive: bool) -> Result<(), StrategyError> {
    let ok = if strictly_positive {
        value > 0.0 && value <= 1.0
    } else {
        (0.0..=1.0).contains(&value)
    };
    if ok {
        Ok(())
    } else {
        Err(StrategyError::Configuration {
            reason: format!("{name} must lie in (0, 1], got {value}"),
        })
    }
}

fn default_profiles() -> BTreeMap<String, WeightProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        "balanced".to_string(),
        WeightProfile {
            apy: 0.30,
            risk: 0.25,
            liquidity: 0.25,
            balance: 0.20,
        },
    );
    profiles.insert(
        "high_yield".to_string(),
        WeightProfile {
            apy: 0.60,
            risk: 0.15,
            liquidity: 0.15,
            balance: 0.10,
        },
    );
    profiles
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                chain: "arbitrum".to_string(),
                rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
                stats_api_url: "https://arbitrum-api.gmxinfra.io".to_string(),
            },
            wallet: WalletConfig {
                address: String::new(),
            },
            strategy: StrategyConfig {
                profile: "balanced".to_string(),
                profiles: default_profiles(),
                min_apy: 0.10,
                max_single_pool_pct: 0.30,
            },
            risk: RiskConfig {
                max_position_usd: Decimal::new(10_000, 0),
                min_position_usd: Decimal::new(100, 0),
                max_drawdown_pct: 0.10,
                stop_loss_pct: 0.15,
                max_imbalance: 0.30,
            },
            pools: PoolsConfig::default(),
            execution: ExecutionConfig {
                check_interval_secs: 300,
                slippage_tolerance: 0.005,
            },
            notifications: NotificationsConfig {
                telegram: TelegramConfig::default(),
                throttle_secs: 3600,
            },
        }
    }
}
