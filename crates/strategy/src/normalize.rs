//! Metric normalization: raw pool metrics to dimensionless [0, 1] sub-scores.
//!
//! APY, liquidity, and risk are scaled against the cross-sectional
//! distribution of the supplied pools for this cycle, not against fixed
//! global constants. Balance is a per-pool transform of the open interest
//! ratio.

use gmxlp_core::{Market, PoolStats, SubScores};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

/// Spread below which a metric is treated as having zero variance.
const MIN_SPREAD: f64 = 1e-12;

/// Normalizes raw metrics for every pool that has both a market and stats in
/// the snapshot. Pools below the strategy's APY floor still get a computed
/// sub-score here; exclusion is the planner's job.
#[must_use]
pub fn normalize(markets: &[Market], pools: &[PoolStats]) -> HashMap<String, SubScores> {
    let market_by_key: HashMap<&str, &Market> = markets
        .iter()
        .map(|m| (m.market_key.as_str(), m))
        .collect();

    let joined: Vec<(&PoolStats, &Market)> = pools
        .iter()
        .filter_map(|p| market_by_key.get(p.market_key.as_str()).map(|m| (p, *m)))
        .collect();

    let apy_scores = min_max(&joined.iter().map(|(p, _)| p.apy).collect::<Vec<_>>());
    let liquidity_scores = min_max(
        &joined
            .iter()
            .map(|(p, _)| (p.tvl.to_f64().unwrap_or(0.0).max(0.0) + 1.0).ln())
            .collect::<Vec<_>>(),
    );
    // Lower observed volatility scores higher.
    let risk_scores: Vec<f64> = min_max(&joined.iter().map(|(p, _)| p.volatility).collect::<Vec<_>>())
        .into_iter()
        .map(|s| 1.0 - s)
        .collect();

    joined
        .iter()
        .enumerate()
        .map(|(i, (pool, market))| {
            (
                pool.market_key.clone(),
                SubScores {
                    apy: apy_scores[i],
                    risk: risk_scores[i],
                    liquidity: liquidity_scores[i],
                    balance: balance_score(market.long_ratio()),
                },
            )
        })
        .collect()
}

/// Balance sub-score: 1.0 for a perfectly balanced market, 0.0 for a fully
/// one-sided one.
#[must_use]
pub fn balance_score(long_ratio: f64) -> f64 {
    (1.0 - (long_ratio - 0.5).abs() * 2.0).clamp(0.0, 1.0)
}

/// Min-max scales `values` into [0, 1]. Zero variance means the metric
/// carries no discriminating information, so every pool gets the
/// neutral-best 1.0 rather than a divide-by-zero.
fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if values.is_empty() || (max - min).abs() < MIN_SPREAD {
        return vec![1.0; values.len()];
    }

    values
        .iter()
        .map(|v| ((v - min) / (max - min)).clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn market(key: &str, long_oi: Decimal, short_oi: Decimal) -> Market {
        Market {
            market_key: key.to_string(),
            name: format!("{key}-USDC"),
            index_token: key.to_string(),
            long_token: key.to_string(),
            short_token: "usdc".to_string(),
            long_oi,
            short_oi,
        }
    }

    fn stats(key: &str, apy: f64, tvl: Decimal, volatility: f64) -> PoolStats {
        PoolStats {
            market_key: key.to_string(),
            apy,
            tvl,
            volume_24h: dec!(1_000_000),
            age_days: 90,
            volatility,
        }
    }

    #[test]
    fn sub_scores_stay_in_unit_interval() {
        let markets = vec![
            market("eth", dec!(500_000), dec!(500_000)),
            market("btc", dec!(600_000), dec!(400_000)),
            market("arb", dec!(900_000), dec!(100_000)),
        ];
        let pools = vec![
            stats("eth", 0.185, dec!(50_000_000), 0.4),
            stats("btc", 0.152, dec!(40_000_000), 0.3),
            stats("arb", 0.243, dec!(10_000_000), 0.9),
        ];

        let subs = normalize(&markets, &pools);
        assert_eq!(subs.len(), 3);
        for s in subs.values() {
            for v in [s.apy, s.risk, s.liquidity, s.balance] {
                assert!((0.0..=1.0).contains(&v), "sub-score out of range: {v}");
            }
        }
    }

    #[test]
    fn apy_min_max_is_cross_sectional() {
        let markets = vec![
            market("a", dec!(1), dec!(1)),
            market("b", dec!(1), dec!(1)),
            market("c", dec!(1), dec!(1)),
        ];
        let pools = vec![
            stats("a", 0.25, dec!(1_000_000), 0.5),
            stats("b", 0.15, dec!(1_000_000), 0.5),
            stats("c", 0.08, dec!(1_000_000), 0.5),
        ];

        let subs = normalize(&markets, &pools);
        assert!((subs["a"].apy - 1.0).abs() < 1e-9);
        assert!((subs["c"].apy - 0.0).abs() < 1e-9);
        let mid = (0.15 - 0.08) / (0.25 - 0.08);
        assert!((subs["b"].apy - mid).abs() < 1e-9);
    }

    #[test]
    fn lowest_volatility_scores_highest_risk_sub() {
        let markets = vec![market("a", dec!(1), dec!(1)), market("b", dec!(1), dec!(1))];
        let pools = vec![
            stats("a", 0.2, dec!(1_000_000), 0.2),
            stats("b", 0.2, dec!(1_000_000), 0.8),
        ];

        let subs = normalize(&markets, &pools);
        assert!((subs["a"].risk - 1.0).abs() < 1e-9);
        assert!((subs["b"].risk - 0.0).abs() < 1e-9);
    }

    // Scenario C: ratio 0.5 -> 1.0 exactly, ratio 0.9 -> 0.2.
    #[test]
    fn balance_score_from_long_ratio() {
        assert!((balance_score(0.5) - 1.0).abs() < f64::EPSILON);
        assert!((balance_score(0.9) - 0.2).abs() < 1e-9);
        assert!((balance_score(0.0) - 0.0).abs() < f64::EPSILON);
        assert!((balance_score(1.0) - 0.0).abs() < f64::EPSILON);
    }

    // Scenario D: identical TVL everywhere -> liquidity 1.0 for every pool.
    #[test]
    fn zero_variance_metric_is_neutral_best() {
        let markets = vec![
            market("a", dec!(1), dec!(1)),
            market("b", dec!(1), dec!(1)),
            market("c", dec!(1), dec!(1)),
        ];
        let pools = vec![
            stats("a", 0.10, dec!(20_000_000), 0.1),
            stats("b", 0.20, dec!(20_000_000), 0.2),
            stats("c", 0.30, dec!(20_000_000), 0.3),
        ];

        let subs = normalize(&markets, &pools);
        for s in subs.values() {
            assert!((s.liquidity - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn single_pool_gets_neutral_best_everywhere() {
        let markets = vec![market("a", dec!(3), dec!(1))];
        let pools = vec![stats("a", 0.12, dec!(5_000_000), 0.4)];

        let subs = normalize(&markets, &pools);
        let s = subs["a"];
        assert!((s.apy - 1.0).abs() < f64::EPSILON);
        assert!((s.risk - 1.0).abs() < f64::EPSILON);
        assert!((s.liquidity - 1.0).abs() < f64::EPSILON);
        // long_ratio 0.75 -> balance 0.5
        assert!((s.balance - 0.5).abs() < 1e-9);
    }

    #[test]
    fn pool_without_market_is_skipped() {
        let markets = vec![market("a", dec!(1), dec!(1))];
        let pools = vec![
            stats("a", 0.2, dec!(1_000_000), 0.5),
            stats("ghost", 0.9, dec!(9_000_000), 0.1),
        ];

        let subs = normalize(&markets, &pools);
        assert_eq!(subs.len(), 1);
        assert!(subs.contains_key("a"));
    }
}
