//! Allocation planning: ranked pools + current holdings -> signal diff.
//!
//! Capital is assigned as a greedy waterfall in rank order rather than a
//! proportional split, so higher-ranked pools fill first and the output is
//! deterministic for a given snapshot.

use chrono::Utc;
use gmxlp_core::{
    Alert, AlertCategory, AlertSeverity, PoolScore, PoolStats, Position, RiskConfig, Signal,
    SignalAction, StrategyConfig, StrategyError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Output of one planning pass. Diagnostics carry the positions that had to
/// be skipped because the snapshot held no data for them; the rest of the
/// plan is unaffected by those.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub signals: Vec<Signal>,
    pub diagnostics: Vec<Alert>,
}

/// Deltas under one cent are treated as already on target.
fn amount_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

#[derive(Debug)]
struct PoolTarget {
    current: Decimal,
    target: Decimal,
    /// Rank of the pool in the eligible walk; `None` for close-outs.
    rank: Option<usize>,
    reason: String,
}

/// Builds the target allocation and its diff against current holdings.
///
/// The per-pool cap is enforced against total managed capital (available
/// plus already-deployed value), so a rebalance cannot route around the
/// concentration limit. Fully executing the returned signals leaves no pool
/// above its cap and total managed value within `max_position_usd`.
///
/// The portfolio cap is enforced by scaling planned increases only. A book
/// whose holdings already exceed `max_position_usd` with no increase to
/// scale is returned unchanged; shrinking such a book is a Decrease the
/// caller must plan for by lowering `max_single_pool_pct` or closing pools,
/// not something the cap can do retroactively.
///
/// # Errors
/// Returns `StrategyError::Configuration` before emitting anything if the
/// weight profile or numeric bounds are invalid; a partial plan is never
/// produced. Missing snapshot data for a held pool is not an error: the
/// pool is skipped and reported in `Plan::diagnostics`.
pub fn plan(
    ranked: &[PoolScore],
    stats: &HashMap<String, PoolStats>,
    positions: &[Position],
    available_capital: Decimal,
    strategy: &StrategyConfig,
    risk: &RiskConfig,
) -> Result<Plan, StrategyError> {
    strategy.validate()?;
    risk.validate()?;

    let max_single = to_decimal(strategy.max_single_pool_pct)?;

    let mut diagnostics = Vec::new();

    // Positions keyed and walked in market-key order for determinism.
    let mut held: BTreeMap<&str, &Position> = BTreeMap::new();
    for pos in positions {
        held.insert(pos.market_key.as_str(), pos);
    }

    let total_managed: Decimal = available_capital.max(Decimal::ZERO)
        + held.values().map(|p| p.current_value).sum::<Decimal>();
    let per_pool_cap = max_single * total_managed;

    let eligible: Vec<(usize, &PoolScore)> = ranked
        .iter()
        .filter(|score| {
            stats
                .get(&score.market_key)
                .is_some_and(|s| s.apy >= strategy.min_apy)
        })
        .enumerate()
        .collect();

    let mut targets: BTreeMap<String, PoolTarget> = BTreeMap::new();

    // Held pools default to a close-out; the eligible walk below overrides
    // the ones that keep their allocation.
    for (key, pos) in &held {
        if !stats.contains_key(*key) {
            diagnostics.push(Alert {
                severity: AlertSeverity::Info,
                category: AlertCategory::UnknownPosition,
                market_key: Some((*key).to_string()),
                message: format!(
                    "position {} has no market data in snapshot; planning skipped",
                    pos.name
                ),
                value: pos.current_value.to_f64().unwrap_or(0.0),
                threshold: 0.0,
                timestamp: Utc::now(),
            });
            continue;
        }
        let apy = stats[*key].apy;
        let reason = if ranked.iter().any(|s| s.market_key == **key) {
            format!(
                "APY {:.1}% below floor {:.1}%",
                apy * 100.0,
                strategy.min_apy * 100.0
            )
        } else {
            "pool no longer in ranked set".to_string()
        };
        targets.insert(
            (*key).to_string(),
            PoolTarget {
                current: pos.current_value,
                target: Decimal::ZERO,
                rank: None,
                reason,
            },
        );
    }

    // Greedy waterfall over eligible pools in rank order.
    let mut remaining = available_capital.max(Decimal::ZERO);
    for (rank, score) in &eligible {
        let existing = held
            .get(score.market_key.as_str())
            .map_or(Decimal::ZERO, |p| p.current_value);
        let headroom = (per_pool_cap - existing).max(Decimal::ZERO);
        let assign = remaining.min(headroom);
        remaining -= assign;

        let target = existing.min(per_pool_cap) + assign;
        let apy = stats[&score.market_key].apy;
        targets.insert(
            score.market_key.clone(),
            PoolTarget {
                current: existing,
                target,
                rank: Some(*rank),
                reason: format!("score {:.2}, APY {:.1}%", score.composite, apy * 100.0),
            },
        );
    }

    enforce_portfolio_cap(&mut targets, risk.max_position_usd);

    let mut signals = build_signals(&targets, risk.min_position_usd);
    signals.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.market_key.cmp(&b.market_key))
    });

    tracing::debug!(
        signals = signals.len(),
        diagnostics = diagnostics.len(),
        unallocated = %remaining,
        "allocation plan built"
    );

    Ok(Plan {
        signals,
        diagnostics,
    })
}

/// Scales every positive delta proportionally when the summed targets exceed
/// the portfolio cap. Decrease/Close targets are left untouched; the cap is
/// respected without re-ranking.
fn enforce_portfolio_cap(targets: &mut BTreeMap<String, PoolTarget>, max_position_usd: Decimal) {
    let total_planned: Decimal = targets.values().map(|t| t.target).sum();
    let excess = total_planned - max_position_usd;
    if excess <= Decimal::ZERO {
        return;
    }

    let total_increase: Decimal = targets
        .values()
        .map(|t| (t.target - t.current).max(Decimal::ZERO))
        .sum();
    if total_increase <= Decimal::ZERO {
        return;
    }

    let factor = ((total_increase - excess) / total_increase).max(Decimal::ZERO);
    for entry in targets.values_mut() {
        let delta = entry.target - entry.current;
        if delta > Decimal::ZERO {
            entry.target = entry.current + delta * factor;
        }
    }
}

fn build_signals(targets: &BTreeMap<String, PoolTarget>, min_position: Decimal) -> Vec<Signal> {
    let tolerance = amount_tolerance();
    let mut signals = Vec::new();

    for (key, entry) in targets {
        let delta = entry.target - entry.current;
        if delta.abs() <= tolerance {
            continue;
        }

        let action = if entry.target <= tolerance {
            SignalAction::Close
        } else if entry.current <= tolerance {
            SignalAction::Open
        } else if delta > Decimal::ZERO {
            SignalAction::Increase
        } else {
            SignalAction::Decrease
        };

        // Dust suppression applies only to capital being added.
        if matches!(action, SignalAction::Open | SignalAction::Increase) && delta < min_position {
            continue;
        }

        let priority = match action {
            SignalAction::Close => 1,
            SignalAction::Decrease => 2,
            SignalAction::Open | SignalAction::Increase => {
                3u8.saturating_add(u8::try_from(entry.rank.unwrap_or(0)).unwrap_or(u8::MAX))
            }
        };

        let target = if entry.target <= tolerance {
            Decimal::ZERO
        } else {
            entry.target
        };
        signals.push(Signal {
            action,
            market_key: key.clone(),
            target_usd: target,
            delta_usd: target - entry.current,
            reason: entry.reason.clone(),
            priority,
        });
    }

    signals
}

fn to_decimal(value: f64) -> Result<Decimal, StrategyError> {
    Decimal::try_from(value).map_err(|_| StrategyError::Configuration {
        reason: format!("percentage {value} is not representable"),
    })
}
