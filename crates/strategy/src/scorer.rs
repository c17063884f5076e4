//! Composite pool scoring.
//!
//! Strategy variants are data, not types: one scoring function parameterized
//! by a validated weight profile replaces per-strategy polymorphism. New
//! strategies are registered as named profiles in configuration.

use chrono::Utc;
use gmxlp_core::{PoolScore, StrategyError, SubScores, WeightProfile};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Scores every pool with the given weight profile and returns the ranking:
/// composite descending, ties broken by liquidity sub-score descending, then
/// by market key ascending so repeated runs order identically.
///
/// # Errors
/// Returns `StrategyError::Configuration` if the profile's weights do not
/// sum to 1.0 within tolerance or contain a negative weight. Nothing is
/// scored on a validation failure.
pub fn score_pools(
    sub_scores: &HashMap<String, SubScores>,
    profile_name: &str,
    profile: &WeightProfile,
) -> Result<Vec<PoolScore>, StrategyError> {
    profile.validate(profile_name)?;

    let computed_at = Utc::now();
    let mut scores: Vec<PoolScore> = sub_scores
        .iter()
        .map(|(market_key, subs)| PoolScore {
            market_key: market_key.clone(),
            composite: composite(subs, profile),
            subs: *subs,
            profile: profile_name.to_string(),
            computed_at,
        })
        .collect();

    scores.sort_by(rank_order);

    Ok(scores)
}

fn composite(subs: &SubScores, profile: &WeightProfile) -> f64 {
    let weighted = subs.apy * profile.apy
        + subs.risk * profile.risk
        + subs.liquidity * profile.liquidity
        + subs.balance * profile.balance;
    weighted.clamp(0.0, 1.0)
}

/// Ranking comparison: composite descending, liquidity sub-score descending,
/// market key ascending.
#[must_use]
pub fn rank_order(a: &PoolScore, b: &PoolScore) -> Ordering {
    b.composite
        .total_cmp(&a.composite)
        .then_with(|| b.subs.liquidity.total_cmp(&a.subs.liquidity))
        .then_with(|| a.market_key.cmp(&b.market_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(apy: f64, risk: f64, liquidity: f64, balance: f64) -> SubScores {
        SubScores {
            apy,
            risk,
            liquidity,
            balance,
        }
    }

    fn balanced() -> WeightProfile {
        WeightProfile {
            apy: 0.30,
            risk: 0.25,
            liquidity: 0.25,
            balance: 0.20,
        }
    }

    #[test]
    fn composite_is_weighted_sum() {
        let mut input = HashMap::new();
        input.insert("eth".to_string(), subs(1.0, 0.8, 0.6, 1.0));

        let scores = score_pools(&input, "balanced", &balanced()).unwrap();
        let expected = 1.0 * 0.30 + 0.8 * 0.25 + 0.6 * 0.25 + 1.0 * 0.20;
        assert!((scores[0].composite - expected).abs() < 1e-9);
        assert_eq!(scores[0].profile, "balanced");
    }

    #[test]
    fn composite_stays_in_unit_interval() {
        let mut input = HashMap::new();
        input.insert("a".to_string(), subs(1.0, 1.0, 1.0, 1.0));
        input.insert("b".to_string(), subs(0.0, 0.0, 0.0, 0.0));

        let scores = score_pools(&input, "balanced", &balanced()).unwrap();
        for score in &scores {
            assert!((0.0..=1.0).contains(&score.composite));
        }
    }

    #[test]
    fn ranking_is_descending_by_composite() {
        let mut input = HashMap::new();
        input.insert("low".to_string(), subs(0.1, 0.1, 0.1, 0.1));
        input.insert("high".to_string(), subs(0.9, 0.9, 0.9, 0.9));
        input.insert("mid".to_string(), subs(0.5, 0.5, 0.5, 0.5));

        let scores = score_pools(&input, "balanced", &balanced()).unwrap();
        let keys: Vec<&str> = scores.iter().map(|s| s.market_key.as_str()).collect();
        assert_eq!(keys, vec!["high", "mid", "low"]);
    }

    #[test]
    fn tie_broken_by_liquidity_then_market_key() {
        // Same composite, different liquidity split.
        let mut input = HashMap::new();
        input.insert("a".to_string(), subs(0.5, 0.5, 0.8, 0.2));
        input.insert("b".to_string(), subs(0.5, 0.5, 0.2, 0.8));

        let profile = WeightProfile {
            apy: 0.25,
            risk: 0.25,
            liquidity: 0.25,
            balance: 0.25,
        };
        let scores = score_pools(&input, "flat", &profile).unwrap();
        assert_eq!(scores[0].market_key, "a");

        // Fully identical sub-scores fall back to the market key.
        let mut identical = HashMap::new();
        identical.insert("zzz".to_string(), subs(0.5, 0.5, 0.5, 0.5));
        identical.insert("aaa".to_string(), subs(0.5, 0.5, 0.5, 0.5));
        let scores = score_pools(&identical, "flat", &profile).unwrap();
        assert_eq!(scores[0].market_key, "aaa");
    }

    #[test]
    fn identical_runs_produce_identical_order() {
        let mut input = HashMap::new();
        for key in ["e", "b", "d", "a", "c"] {
            input.insert(key.to_string(), subs(0.5, 0.5, 0.5, 0.5));
        }

        let first = score_pools(&input, "balanced", &balanced()).unwrap();
        for _ in 0..10 {
            let again = score_pools(&input, "balanced", &balanced()).unwrap();
            let a: Vec<&str> = first.iter().map(|s| s.market_key.as_str()).collect();
            let b: Vec<&str> = again.iter().map(|s| s.market_key.as_str()).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn invalid_profile_scores_nothing() {
        let mut input = HashMap::new();
        input.insert("eth".to_string(), subs(1.0, 1.0, 1.0, 1.0));

        let profile = WeightProfile {
            apy: 0.9,
            risk: 0.9,
            liquidity: 0.0,
            balance: 0.0,
        };
        let err = score_pools(&input, "broken", &profile).unwrap_err();
        assert!(matches!(err, StrategyError::Configuration { .. }));
    }

    #[test]
    fn arbitrary_profile_is_accepted_when_valid() {
        let mut input = HashMap::new();
        input.insert("eth".to_string(), subs(0.4, 0.4, 0.4, 0.4));

        // Not one of the two built-ins; profiles are data.
        let profile = WeightProfile {
            apy: 1.0,
            risk: 0.0,
            liquidity: 0.0,
            balance: 0.0,
        };
        let scores = score_pools(&input, "apy_only", &profile).unwrap();
        assert!((scores[0].composite - 0.4).abs() < 1e-9);
    }
}
