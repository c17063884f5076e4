use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A GM liquidity market as observed at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub market_key: String,
    /// Human-readable asset pair, e.g. "ETH-USDC".
    pub name: String,
    pub index_token: String,
    pub long_token: String,
    pub short_token: String,
    /// Long open interest in USD.
    pub long_oi: Decimal,
    /// Short open interest in USD.
    pub short_oi: Decimal,
}

impl Market {
    /// Long share of total open interest. An empty market counts as balanced.
    #[must_use]
    pub fn long_ratio(&self) -> f64 {
        let total = self.long_oi + self.short_oi;
        if total <= Decimal::ZERO {
            return 0.5;
        }
        (self.long_oi / total).to_f64().unwrap_or(0.5)
    }

    /// Open interest imbalance: 0 = perfectly balanced, 1 = fully one-sided.
    #[must_use]
    pub fn oi_imbalance(&self) -> f64 {
        (self.long_ratio() - 0.5).abs() * 2.0
    }
}

/// Per-pool statistics for one evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub market_key: String,
    /// Annualized yield as a fraction (0.25 = 25% APY).
    pub apy: f64,
    /// Total value locked in USD.
    pub tvl: Decimal,
    pub volume_24h: Decimal,
    pub age_days: u32,
    /// Volatility proxy for the underlying; higher means riskier.
    pub volatility: f64,
}

/// Normalized sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub apy: f64,
    pub risk: f64,
    pub liquidity: f64,
    pub balance: f64,
}

/// Composite ranking entry for one pool. Recomputed every cycle, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolScore {
    pub market_key: String,
    /// Weighted composite in [0, 1].
    pub composite: f64,
    pub subs: SubScores,
    /// Name of the weight profile that produced this score.
    pub profile: String,
    pub computed_at: DateTime<Utc>,
}

/// An open allocation, owned by the execution collaborator. The core only
/// reads it and emits signals describing desired changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub market_key: String,
    pub name: String,
    pub entry_value: Decimal,
    pub current_value: Decimal,
    pub entered_at: DateTime<Utc>,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
}

impl Position {
    /// Fractional loss relative to entry value. `None` when the entry value
    /// is non-positive, in which case drawdown is undefined and the position
    /// is excluded from drawdown checks rather than treated as a breach.
    #[must_use]
    pub fn drawdown(&self) -> Option<f64> {
        if self.entry_value <= Decimal::ZERO {
            return None;
        }
        ((self.entry_value - self.current_value) / self.entry_value).to_f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Open,
    Increase,
    Decrease,
    Close,
}

/// Desired change in allocated USD value for one pool. Immutable once
/// emitted; consumed exactly once by the execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub market_key: String,
    /// Desired post-execution value. Always >= 0.
    pub target_usd: Decimal,
    /// `target_usd` minus the current value; negative for Decrease/Close.
    pub delta_usd: Decimal,
    pub reason: String,
    /// Lower runs first.
    pub priority: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCategory {
    Drawdown,
    Imbalance,
    Concentration,
    StopLoss,
    /// A held position has no matching market/stats in the snapshot.
    UnknownPosition,
}

/// A graded risk finding. `market_key = None` marks portfolio-level alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub market_key: Option<String>,
    pub message: String,
    /// Measured value that triggered the alert.
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        match self.severity {
            AlertSeverity::Info => "\u{2139}\u{fe0f}",
            AlertSeverity::Warning => "\u{26a0}\u{fe0f}",
            AlertSeverity::Critical => "\u{1f6a8}",
        }
    }
}

/// One immutable input to a core evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub markets: Vec<Market>,
    pub stats: Vec<PoolStats>,
    pub positions: Vec<Position>,
    pub taken_at: DateTime<Utc>,
}
