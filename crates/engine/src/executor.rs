use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use gmxlp_core::{ExecutionHandler, Position, Signal, SignalAction};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Execution handler that applies signals to an in-memory position book
/// instead of submitting transactions. Used for dry runs and tests.
pub struct PaperExecutor {
    positions: BTreeMap<String, Position>,
}

impl PaperExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            positions: BTreeMap::new(),
        }
    }

    /// Seeds the book with existing holdings.
    #[must_use]
    pub fn with_positions(positions: Vec<Position>) -> Self {
        Self {
            positions: positions
                .into_iter()
                .map(|p| (p.market_key.clone(), p))
                .collect(),
        }
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.positions.values().cloned().collect()
    }

    #[must_use]
    pub fn total_value(&self) -> Decimal {
        self.positions.values().map(|p| p.current_value).sum()
    }
}

impl Default for PaperExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionHandler for PaperExecutor {
    async fn execute(&mut self, signal: &Signal) -> Result<()> {
        tracing::info!(
            action = ?signal.action,
            market = %signal.market_key,
            target = %signal.target_usd,
            delta = %signal.delta_usd,
            reason = %signal.reason,
            "paper execution"
        );

        match signal.action {
            SignalAction::Open => {
                if self.positions.contains_key(&signal.market_key) {
                    bail!("open signal for already-held pool {}", signal.market_key);
                }
                self.positions.insert(
                    signal.market_key.clone(),
                    Position {
                        market_key: signal.market_key.clone(),
                        name: signal.market_key.clone(),
                        entry_value: signal.target_usd,
                        current_value: signal.target_usd,
                        entered_at: Utc::now(),
                        realized_pnl: Decimal::ZERO,
                        unrealized_pnl: Decimal::ZERO,
                    },
                );
            }
            SignalAction::Increase => {
                let Some(pos) = self.positions.get_mut(&signal.market_key) else {
                    bail!("increase signal for unknown pool {}", signal.market_key);
                };
                pos.entry_value += signal.delta_usd;
                pos.current_value = signal.target_usd;
            }
            SignalAction::Decrease => {
                let Some(pos) = self.positions.get_mut(&signal.market_key) else {
                    bail!("decrease signal for unknown pool {}", signal.market_key);
                };
                // Withdrawals realize PnL proportionally to the share sold.
                if pos.current_value > Decimal::ZERO {
                    let fraction = signal.target_usd / pos.current_value;
                    let released_cost = pos.entry_value * (Decimal::ONE - fraction);
                    pos.realized_pnl += -signal.delta_usd - released_cost;
                    pos.entry_value *= fraction;
                }
                pos.current_value = signal.target_usd;
            }
            SignalAction::Close => {
                let Some(pos) = self.positions.remove(&signal.market_key) else {
                    bail!("close signal for unknown pool {}", signal.market_key);
                };
                tracing::info!(
                    market = %signal.market_key,
                    pnl = %(pos.current_value - pos.entry_value + pos.realized_pnl),
                    "position closed"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal(action: SignalAction, key: &str, target: Decimal, delta: Decimal) -> Signal {
        Signal {
            action,
            market_key: key.to_string(),
            target_usd: target,
            delta_usd: delta,
            reason: "test".to_string(),
            priority: 1,
        }
    }

    #[tokio::test]
    async fn open_then_increase_builds_the_position() {
        let mut executor = PaperExecutor::new();
        executor
            .execute(&signal(SignalAction::Open, "eth", dec!(300), dec!(300)))
            .await
            .unwrap();
        executor
            .execute(&signal(SignalAction::Increase, "eth", dec!(500), dec!(200)))
            .await
            .unwrap();

        let positions = executor.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].current_value, dec!(500));
        assert_eq!(positions[0].entry_value, dec!(500));
        assert_eq!(executor.total_value(), dec!(500));
    }

    #[tokio::test]
    async fn decrease_then_close_empties_the_book() {
        let mut executor = PaperExecutor::new();
        executor
            .execute(&signal(SignalAction::Open, "eth", dec!(600), dec!(600)))
            .await
            .unwrap();
        executor
            .execute(&signal(SignalAction::Decrease, "eth", dec!(200), dec!(-400)))
            .await
            .unwrap();
        assert_eq!(executor.total_value(), dec!(200));

        executor
            .execute(&signal(SignalAction::Close, "eth", dec!(0), dec!(-200)))
            .await
            .unwrap();
        assert!(executor.positions().is_empty());
    }

    #[tokio::test]
    async fn duplicate_open_is_rejected() {
        let mut executor = PaperExecutor::new();
        executor
            .execute(&signal(SignalAction::Open, "eth", dec!(300), dec!(300)))
            .await
            .unwrap();
        let err = executor
            .execute(&signal(SignalAction::Open, "eth", dec!(300), dec!(300)))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn close_of_unknown_pool_is_rejected() {
        let mut executor = PaperExecutor::new();
        let err = executor
            .execute(&signal(SignalAction::Close, "ghost", dec!(0), dec!(0)))
            .await;
        assert!(err.is_err());
    }
}
