//! Risk monitoring: holdings vs. drawdown, imbalance, and concentration
//! thresholds.
//!
//! The monitor is stateless per cycle: everything is recomputed from the
//! snapshot. Duplicate-alert suppression belongs to the notification
//! collaborator (see `gmxlp-notify`), never to this evaluation.

use chrono::Utc;
use gmxlp_core::{
    Alert, AlertCategory, AlertSeverity, Market, PoolStats, Position, RiskConfig, StrategyConfig,
    StrategyError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of one monitoring pass. `emergency_exit` is the sole authority
/// the execution collaborator uses to unwind immediately instead of waiting
/// for the next planning cycle.
#[derive(Debug, Clone, Default)]
pub struct RiskReport {
    pub alerts: Vec<Alert>,
    pub emergency_exit: bool,
}

/// Runs every check against the snapshot. Checks are independent; none
/// short-circuits another, so a position can raise drawdown, imbalance, and
/// concentration alerts in the same cycle.
///
/// # Errors
/// Returns `StrategyError::Configuration` before emitting any alert when a
/// threshold is invalid.
pub fn evaluate(
    positions: &[Position],
    markets: &HashMap<String, Market>,
    _stats: &HashMap<String, PoolStats>,
    strategy: &StrategyConfig,
    risk: &RiskConfig,
) -> Result<RiskReport, StrategyError> {
    strategy.validate()?;
    risk.validate()?;

    // Walk positions in market-key order so alert ordering is reproducible.
    let mut ordered: Vec<&Position> = positions.iter().collect();
    ordered.sort_by(|a, b| a.market_key.cmp(&b.market_key));

    let mut report = RiskReport::default();
    check_drawdown(&ordered, risk, &mut report);
    check_imbalance(&ordered, markets, risk, &mut report);
    check_concentration(&ordered, strategy, &mut report);
    check_portfolio_drawdown(&ordered, risk, &mut report);

    if report.emergency_exit {
        tracing::warn!(alerts = report.alerts.len(), "stop-loss breached, emergency exit set");
    }

    Ok(report)
}

/// Per-position drawdown. A stop-loss breach escalates the alert to one
/// Critical/StopLoss entry rather than stacking a warning on top; positions
/// with an undefined drawdown (non-positive entry) are excluded.
fn check_drawdown(positions: &[&Position], risk: &RiskConfig, report: &mut RiskReport) {
    for pos in positions {
        let Some(dd) = pos.drawdown() else { continue };

        if dd >= risk.stop_loss_pct {
            report.emergency_exit = true;
            report.alerts.push(alert(
                AlertSeverity::Critical,
                AlertCategory::StopLoss,
                Some(&pos.market_key),
                format!("{}: loss {:.1}% breaches stop-loss", pos.name, dd * 100.0),
                dd,
                risk.stop_loss_pct,
            ));
        } else if dd >= risk.max_drawdown_pct {
            report.alerts.push(alert(
                AlertSeverity::Warning,
                AlertCategory::Drawdown,
                Some(&pos.market_key),
                format!("{}: drawdown {:.1}%", pos.name, dd * 100.0),
                dd,
                risk.max_drawdown_pct,
            ));
        }
    }
}

fn check_imbalance(
    positions: &[&Position],
    markets: &HashMap<String, Market>,
    risk: &RiskConfig,
    report: &mut RiskReport,
) {
    for pos in positions {
        let Some(market) = markets.get(&pos.market_key) else {
            continue;
        };
        let imbalance = market.oi_imbalance();
        if imbalance > risk.max_imbalance {
            let side = if market.long_ratio() > 0.5 { "long" } else { "short" };
            report.alerts.push(alert(
                AlertSeverity::Warning,
                AlertCategory::Imbalance,
                Some(&pos.market_key),
                format!("{}: {side}-heavy, imbalance {imbalance:.2}", pos.name),
                imbalance,
                risk.max_imbalance,
            ));
        }
    }
}

/// Concentration can fire without any new allocation, e.g. after the other
/// positions shrink.
fn check_concentration(positions: &[&Position], strategy: &StrategyConfig, report: &mut RiskReport) {
    let total: Decimal = positions.iter().map(|p| p.current_value).sum();
    if total <= Decimal::ZERO {
        return;
    }

    for pos in positions {
        let share = (pos.current_value / total).to_f64().unwrap_or(0.0);
        if share > strategy.max_single_pool_pct {
            report.alerts.push(alert(
                AlertSeverity::Warning,
                AlertCategory::Concentration,
                Some(&pos.market_key),
                format!("{}: {:.1}% of managed value", pos.name, share * 100.0),
                share,
                strategy.max_single_pool_pct,
            ));
        }
    }
}

/// Value-weighted aggregate drawdown with the same thresholds as the
/// per-position check, reported as a portfolio-level (nullable market) alert.
fn check_portfolio_drawdown(positions: &[&Position], risk: &RiskConfig, report: &mut RiskReport) {
    let entry: Decimal = positions
        .iter()
        .filter(|p| p.entry_value > Decimal::ZERO)
        .map(|p| p.entry_value)
        .sum();
    if entry <= Decimal::ZERO {
        return;
    }
    let current: Decimal = positions
        .iter()
        .filter(|p| p.entry_value > Decimal::ZERO)
        .map(|p| p.current_value)
        .sum();
    let Some(dd) = ((entry - current) / entry).to_f64() else {
        return;
    };

    if dd >= risk.stop_loss_pct {
        report.emergency_exit = true;
        report.alerts.push(alert(
            AlertSeverity::Critical,
            AlertCategory::StopLoss,
            None,
            format!("portfolio loss {:.1}% breaches stop-loss", dd * 100.0),
            dd,
            risk.stop_loss_pct,
        ));
    } else if dd >= risk.max_drawdown_pct {
        report.alerts.push(alert(
            AlertSeverity::Warning,
            AlertCategory::Drawdown,
            None,
            format!("portfolio drawdown {:.1}%", dd * 100.0),
            dd,
            risk.max_drawdown_pct,
        ));
    }
}

fn alert(
    severity: AlertSeverity,
    category: AlertCategory,
    market_key: Option<&str>,
    message: String,
    value: f64,
    threshold: f64,
) -> Alert {
    Alert {
        severity,
        category,
        market_key: market_key.map(str::to_string),
        message,
        value,
        threshold,
        timestamp: Utc::now(),
    }
}

/// Overall risk grade derived from the alerts of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Normal,
    Elevated,
    High,
    Critical,
}

/// Presentation-level digest of portfolio risk for status displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total_value_usd: Decimal,
    pub total_pnl_usd: Decimal,
    pub overall_pnl_pct: f64,
    pub max_concentration_pct: f64,
    pub alert_count: usize,
    pub level: RiskLevel,
}

/// Builds the digest from holdings plus the report of the same cycle.
#[must_use]
pub fn risk_summary(positions: &[Position], report: &RiskReport) -> RiskSummary {
    let total_value: Decimal = positions.iter().map(|p| p.current_value).sum();
    let total_pnl: Decimal = positions.iter().map(|p| p.unrealized_pnl).sum();
    let total_entry: Decimal = positions
        .iter()
        .filter(|p| p.entry_value > Decimal::ZERO)
        .map(|p| p.entry_value)
        .sum();

    let overall_pnl_pct = if total_entry > Decimal::ZERO {
        (total_pnl / total_entry).to_f64().unwrap_or(0.0)
    } else {
        0.0
    };

    let max_concentration_pct = if total_value > Decimal::ZERO {
        positions
            .iter()
            .map(|p| (p.current_value / total_value).to_f64().unwrap_or(0.0))
            .fold(0.0, f64::max)
    } else {
        0.0
    };

    let critical = report
        .alerts
        .iter()
        .filter(|a| a.severity == AlertSeverity::Critical)
        .count();
    let warnings = report
        .alerts
        .iter()
        .filter(|a| a.severity == AlertSeverity::Warning)
        .count();
    let level = if critical > 0 {
        RiskLevel::Critical
    } else if warnings >= 3 {
        RiskLevel::High
    } else if warnings >= 1 {
        RiskLevel::Elevated
    } else {
        RiskLevel::Normal
    };

    RiskSummary {
        total_value_usd: total_value,
        total_pnl_usd: total_pnl,
        overall_pnl_pct,
        max_concentration_pct,
        alert_count: report.alerts.len(),
        level,
    }
}
