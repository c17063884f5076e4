use thiserror::Error;

/// Failure taxonomy for core evaluation.
///
/// `Configuration` is fatal to the whole cycle: the caller must not apply a
/// plan built on invalid weights or thresholds, so it is raised before any
/// scoring or planning output exists. `InsufficientData` is localized to one
/// pool; the planner downgrades it to a diagnostic alert and skips the pool.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("no market data in snapshot for position {market_key}")]
    InsufficientData { market_key: String },
}
