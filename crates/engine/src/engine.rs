//! Orchestration of one evaluation cycle and the cadenced loop around it.
//!
//! The engine owns everything the core deliberately does not: cycle timing,
//! retries on collaborator failure, alert throttling, and turning the
//! monitor's `emergency_exit` into an immediate close-all that bypasses
//! normal signal sequencing.

use anyhow::{Context, Result};
use chrono::Utc;
use gmxlp_core::{
    AppConfig, ExecutionHandler, Market, Notifier, PoolStats, Position, Signal, SignalAction,
    Snapshot, SnapshotProvider,
};
use gmxlp_notify::AlertThrottle;
use gmxlp_risk::{risk_summary, RiskSummary};
use gmxlp_strategy::{normalize, plan, score_pools};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

pub struct AllocationEngine<P, E, N>
where
    P: SnapshotProvider,
    E: ExecutionHandler,
    N: Notifier,
{
    config: AppConfig,
    provider: P,
    executor: E,
    notifier: N,
    throttle: AlertThrottle,
    available_capital: Decimal,
    dry_run: bool,
}

/// What one cycle decided and did, for logging and status display.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub signals: Vec<Signal>,
    pub executed: usize,
    pub alerts_raised: usize,
    pub alerts_delivered: usize,
    pub emergency_exit: bool,
    pub summary: RiskSummary,
}

/// One row of the rankings table.
#[derive(Debug, Clone, Serialize)]
pub struct PoolRanking {
    pub name: String,
    pub market_key: String,
    pub apy: f64,
    pub tvl: Decimal,
    pub composite: f64,
    pub apy_score: f64,
    pub risk_score: f64,
    pub liquidity_score: f64,
    pub balance_score: f64,
}

impl<P, E, N> AllocationEngine<P, E, N>
where
    P: SnapshotProvider,
    E: ExecutionHandler,
    N: Notifier,
{
    /// Builds the engine, failing fast on invalid configuration so a broken
    /// config never reaches the first cycle.
    ///
    /// # Errors
    /// Returns an error when the strategy or risk configuration is invalid.
    pub fn new(
        config: AppConfig,
        provider: P,
        executor: E,
        notifier: N,
        available_capital: Decimal,
        dry_run: bool,
    ) -> Result<Self> {
        config.strategy.validate().context("strategy config")?;
        config.risk.validate().context("risk config")?;
        let throttle = AlertThrottle::new(config.notifications.throttle_secs);

        Ok(Self {
            config,
            provider,
            executor,
            notifier,
            throttle,
            available_capital,
            dry_run,
        })
    }

    /// Runs cycles forever at the configured cadence. A failed cycle is
    /// logged and retried on the next tick; only shutdown stops the loop.
    ///
    /// # Errors
    /// Currently only returns through cancellation by the caller.
    pub async fn run(&mut self) -> Result<()> {
        let period = Duration::from_secs(self.config.execution.check_interval_secs);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok(report) => {
                    tracing::info!(
                        signals = report.signals.len(),
                        executed = report.executed,
                        alerts = report.alerts_raised,
                        emergency = report.emergency_exit,
                        level = ?report.summary.level,
                        "cycle complete"
                    );
                }
                Err(error) => {
                    tracing::error!(%error, "cycle failed, retrying next tick");
                }
            }
        }
    }

    /// One full evaluation: snapshot in, signals and alerts out, execution
    /// and notification delegated to the collaborators.
    ///
    /// # Errors
    /// Returns an error when the snapshot or execution collaborator fails
    /// or the configuration is rejected by the core. Notifier failures are
    /// logged and do not fail the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let snapshot = self.provider.snapshot().await.context("snapshot")?;
        let (ranked, markets_by_key, stats_by_key) = self.score(&snapshot)?;

        let plan = plan(
            &ranked,
            &stats_by_key,
            &snapshot.positions,
            self.available_capital,
            &self.config.strategy,
            &self.config.risk,
        )?;

        let report = gmxlp_risk::evaluate(
            &snapshot.positions,
            &markets_by_key,
            &stats_by_key,
            &self.config.strategy,
            &self.config.risk,
        )?;
        let summary = risk_summary(&snapshot.positions, &report);

        let mut alerts = report.alerts;
        alerts.extend(plan.diagnostics);
        // Delivery failures must never stall the cycle: an unreachable
        // notifier while a stop-loss is breached would otherwise block the
        // close-all below.
        let mut delivered = 0;
        for alert in &alerts {
            if self.throttle.admit(alert) {
                match self.notifier.notify(alert).await {
                    Ok(()) => delivered += 1,
                    Err(error) => {
                        tracing::error!(%error, message = %alert.message, "alert delivery failed");
                    }
                }
            }
        }
        self.throttle.expire(Utc::now());

        // Emergency exit bypasses the planned sequence entirely.
        let signals = if report.emergency_exit {
            close_all(&snapshot.positions)
        } else {
            plan.signals
        };

        let mut executed = 0;
        if !self.dry_run {
            for signal in &signals {
                self.executor
                    .execute(signal)
                    .await
                    .with_context(|| format!("executing signal for {}", signal.market_key))?;
                executed += 1;
            }
        }

        Ok(CycleReport {
            signals,
            executed,
            alerts_raised: alerts.len(),
            alerts_delivered: delivered,
            emergency_exit: report.emergency_exit,
            summary,
        })
    }

    /// Scores the current snapshot without planning or executing anything.
    ///
    /// # Errors
    /// Returns an error when the snapshot cannot be fetched or the weight
    /// profile is invalid.
    pub async fn rankings(&self) -> Result<Vec<PoolRanking>> {
        let snapshot = self.provider.snapshot().await.context("snapshot")?;
        let (ranked, markets_by_key, stats_by_key) = self.score(&snapshot)?;

        Ok(ranked
            .into_iter()
            .map(|score| {
                let name = markets_by_key
                    .get(&score.market_key)
                    .map_or_else(String::new, |m| m.name.clone());
                let (apy, tvl) = stats_by_key
                    .get(&score.market_key)
                    .map_or((0.0, Decimal::ZERO), |s| (s.apy, s.tvl));
                PoolRanking {
                    name,
                    market_key: score.market_key,
                    apy,
                    tvl,
                    composite: score.composite,
                    apy_score: score.subs.apy,
                    risk_score: score.subs.risk,
                    liquidity_score: score.subs.liquidity,
                    balance_score: score.subs.balance,
                }
            })
            .collect())
    }

    fn score(
        &self,
        snapshot: &Snapshot,
    ) -> Result<(
        Vec<gmxlp_core::PoolScore>,
        HashMap<String, Market>,
        HashMap<String, PoolStats>,
    )> {
        // Whitelist/blacklist filtering happens before scoring; positions in
        // filtered pools fall out of the ranked set and get closed by the
        // planner.
        let allowed: Vec<Market> = snapshot
            .markets
            .iter()
            .filter(|m| self.config.pools.allows(&m.name))
            .cloned()
            .collect();

        let subs = normalize(&allowed, &snapshot.stats);
        let profile = self.config.strategy.active_profile()?;
        let ranked = score_pools(&subs, &self.config.strategy.profile, &profile)?;

        let markets_by_key = snapshot
            .markets
            .iter()
            .map(|m| (m.market_key.clone(), m.clone()))
            .collect();
        let stats_by_key = snapshot
            .stats
            .iter()
            .map(|s| (s.market_key.clone(), s.clone()))
            .collect();
        Ok((ranked, markets_by_key, stats_by_key))
    }
}

/// Close-out for every open position, highest priority, used only on
/// emergency exit.
fn close_all(positions: &[Position]) -> Vec<Signal> {
    let mut ordered: Vec<&Position> = positions.iter().collect();
    ordered.sort_by(|a, b| a.market_key.cmp(&b.market_key));

    ordered
        .into_iter()
        .map(|pos| Signal {
            action: SignalAction::Close,
            market_key: pos.market_key.clone(),
            target_usd: Decimal::ZERO,
            delta_usd: -pos.current_value,
            reason: "emergency exit: stop-loss breached".to_string(),
            priority: 0,
        })
        .collect()
}
