//! Fractional Kelly stake sizing with a value-score ladder and risk tiers.
//!
//! "No bet" is a normal outcome and is always `None`, never an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DEFAULT_KELLY_FRACTION, StakingConfig};
use crate::forecast::SimulationSummary;
use crate::score::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    fn stake_scale(self) -> f64 {
        match self {
            RiskTier::Low => 1.0,
            RiskTier::Medium => 0.8,
            RiskTier::High => 0.5,
            RiskTier::VeryHigh => 0.3,
        }
    }
}

/// Fractional Kelly stake, capped at `bankroll_cap`.
///
/// A multiplier that is not a positive finite number means "don't stake",
/// so it yields `None` like any other no-bet case.
pub fn kelly_with(
    probability: f64,
    decimal_odds: f64,
    fractional_multiplier: f64,
    bankroll_cap: f64,
) -> Option<f64> {
    if !(probability > 0.0 && probability < 1.0) || !(decimal_odds > 1.0) {
        return None;
    }
    if !fractional_multiplier.is_finite() || fractional_multiplier <= 0.0 {
        return None;
    }
    let b = decimal_odds - 1.0;
    let q = 1.0 - probability;
    let raw = (b * probability - q) / b;
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some((raw * fractional_multiplier).min(bankroll_cap))
}

pub fn kelly(probability: f64, decimal_odds: f64, fractional_multiplier: f64) -> Option<f64> {
    kelly_with(
        probability,
        decimal_odds,
        fractional_multiplier,
        crate::config::DEFAULT_BANKROLL_CAP,
    )
}

pub fn quarter_kelly(probability: f64, decimal_odds: f64) -> Option<f64> {
    kelly(probability, decimal_odds, DEFAULT_KELLY_FRACTION)
}

pub fn value_score(kelly: Option<f64>) -> u8 {
    const LADDER: [(f64, u8); 9] = [
        (0.25, 10),
        (0.20, 9),
        (0.15, 8),
        (0.10, 7),
        (0.08, 6),
        (0.06, 5),
        (0.04, 4),
        (0.02, 3),
        (0.01, 2),
    ];
    let Some(k) = kelly else {
        return 0;
    };
    LADDER
        .iter()
        .find(|(threshold, _)| k >= *threshold)
        .map(|(_, score)| *score)
        .unwrap_or(1)
}

/// Unknown edge is treated as risky, not safe.
pub fn risk_tier(kelly: Option<f64>) -> RiskTier {
    match kelly {
        None => RiskTier::High,
        Some(k) if k >= 0.20 => RiskTier::VeryHigh,
        Some(k) if k >= 0.10 => RiskTier::High,
        Some(k) if k >= 0.04 => RiskTier::Medium,
        Some(_) => RiskTier::Low,
    }
}

pub fn recommended_stake(kelly: Option<f64>, tier: RiskTier) -> f64 {
    match kelly {
        Some(k) if k > 0.0 => (k * tier.stake_scale()).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Expected return per unit staked.
pub fn edge(probability: f64, decimal_odds: f64) -> f64 {
    probability * decimal_odds - 1.0
}

/// Bookmaker implied probabilities with the overround removed.
pub fn no_vig_probabilities(home: f64, draw: f64, away: f64) -> Option<(f64, f64, f64)> {
    if home <= 1.0 || draw <= 1.0 || away <= 1.0 {
        return None;
    }
    let ih = 1.0 / home;
    let id = 1.0 / draw;
    let ia = 1.0 / away;
    let sum = ih + id + ia;
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some((ih / sum, id / sum, ia / sum))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub probability: f64,
    pub decimal_odds: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketQuotes {
    pub home: Option<MarketQuote>,
    pub draw: Option<MarketQuote>,
    pub away: Option<MarketQuote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecimalOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl MarketQuotes {
    pub fn from_simulation(sim: &SimulationSummary, odds: DecimalOdds) -> Self {
        Self {
            home: Some(MarketQuote {
                probability: sim.home_win(),
                decimal_odds: odds.home,
            }),
            draw: Some(MarketQuote {
                probability: sim.draw(),
                decimal_odds: odds.draw,
            }),
            away: Some(MarketQuote {
                probability: sim.away_win(),
                decimal_odds: odds.away,
            }),
        }
    }

    fn get(&self, market: Outcome) -> Option<MarketQuote> {
        match market {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTriple<T> {
    pub home: T,
    pub draw: T,
    pub away: T,
}

impl<T: Copy> MarketTriple<T> {
    pub fn get(&self, market: Outcome) -> T {
        match market {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeRecommendation {
    pub kelly: MarketTriple<Option<f64>>,
    pub value_scores: MarketTriple<u8>,
    pub best_market: Option<Outcome>,
    pub risk_tier: RiskTier,
    pub stake_fraction: f64,
}

impl StakeRecommendation {
    pub fn from_quotes(quotes: &MarketQuotes, cfg: &StakingConfig) -> Self {
        let kelly_for = |market: Outcome| {
            quotes.get(market).and_then(|q| {
                kelly_with(
                    q.probability,
                    q.decimal_odds,
                    cfg.fractional_multiplier,
                    cfg.bankroll_cap,
                )
            })
        };
        let kelly = MarketTriple {
            home: kelly_for(Outcome::Home),
            draw: kelly_for(Outcome::Draw),
            away: kelly_for(Outcome::Away),
        };
        let value_scores = MarketTriple {
            home: value_score(kelly.home),
            draw: value_score(kelly.draw),
            away: value_score(kelly.away),
        };

        // Earlier markets win exact ties.
        let mut best: Option<(Outcome, u8, f64)> = None;
        for (market, k, score) in [
            (Outcome::Home, kelly.home, value_scores.home),
            (Outcome::Draw, kelly.draw, value_scores.draw),
            (Outcome::Away, kelly.away, value_scores.away),
        ] {
            let Some(k) = k else { continue };
            let better = match best {
                None => true,
                Some((_, best_score, best_k)) => {
                    score > best_score || (score == best_score && k > best_k)
                }
            };
            if better {
                best = Some((market, score, k));
            }
        }

        let best_market = best.map(|(m, _, _)| m);
        let best_kelly = best.map(|(_, _, k)| k);
        let tier = risk_tier(best_kelly);
        let stake_fraction = recommended_stake(best_kelly, tier);

        debug!(
            best_market = ?best_market,
            risk_tier = ?tier,
            stake_fraction,
            "stake recommendation"
        );

        Self {
            kelly,
            value_scores,
            best_market,
            risk_tier: tier,
            stake_fraction,
        }
    }

    pub fn has_value(&self) -> bool {
        self.best_market.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::SimulationParams;
    use crate::score::Scoreline;
    use proptest::prelude::*;

    #[test]
    fn quarter_kelly_with_edge() {
        // raw = (1.5 * 0.6 - 0.4) / 1.5 = 1/3
        let k = quarter_kelly(0.6, 2.5).unwrap();
        assert!((k - (1.0 / 3.0) * 0.25).abs() < 1e-12);
        assert!(k > 0.0 && k <= 0.25);
    }

    #[test]
    fn no_edge_is_no_bet() {
        assert_eq!(quarter_kelly(0.3, 1.5), None);
        assert_eq!(quarter_kelly(0.5, 2.0), None);
    }

    #[test]
    fn invalid_inputs_are_no_bet_not_errors() {
        assert_eq!(quarter_kelly(0.0, 3.0), None);
        assert_eq!(quarter_kelly(1.0, 3.0), None);
        assert_eq!(quarter_kelly(0.5, 1.0), None);
        assert_eq!(quarter_kelly(f64::NAN, 3.0), None);
        assert_eq!(quarter_kelly(0.5, f64::NAN), None);
    }

    #[test]
    fn bankroll_cap_binds_with_full_kelly() {
        // raw = (9 * 0.9 - 0.1) / 9 ~= 0.889
        assert_eq!(kelly(0.9, 10.0, 1.0), Some(0.25));
        assert_eq!(kelly_with(0.9, 10.0, 1.0, 0.5), Some(0.5));
    }

    #[test]
    fn unusable_multiplier_is_no_bet() {
        assert_eq!(kelly_with(0.6, 2.5, 0.0, 0.25), None);
        assert_eq!(kelly_with(0.6, 2.5, -0.5, 0.25), None);
        assert_eq!(kelly_with(0.6, 2.5, f64::NAN, 0.25), None);
        assert_eq!(kelly_with(0.6, 2.5, f64::INFINITY, 0.25), None);
        assert!(kelly_with(0.6, 2.5, 0.05, 0.25).is_some());
    }

    #[test]
    fn value_ladder_boundaries() {
        assert_eq!(value_score(None), 0);
        assert_eq!(value_score(Some(0.005)), 1);
        assert_eq!(value_score(Some(0.01)), 2);
        assert_eq!(value_score(Some(0.079)), 5);
        assert_eq!(value_score(Some(0.08)), 6);
        assert_eq!(value_score(Some(0.25)), 10);
    }

    #[test]
    fn risk_tier_boundaries() {
        assert_eq!(risk_tier(None), RiskTier::High);
        assert_eq!(risk_tier(Some(0.039)), RiskTier::Low);
        assert_eq!(risk_tier(Some(0.04)), RiskTier::Medium);
        assert_eq!(risk_tier(Some(0.10)), RiskTier::High);
        assert_eq!(risk_tier(Some(0.20)), RiskTier::VeryHigh);
    }

    #[test]
    fn stake_scales_by_tier() {
        assert!((recommended_stake(Some(0.05), RiskTier::Medium) - 0.04).abs() < 1e-12);
        assert!((recommended_stake(Some(0.2), RiskTier::VeryHigh) - 0.06).abs() < 1e-12);
        assert_eq!(recommended_stake(None, RiskTier::Low), 0.0);
        assert_eq!(recommended_stake(Some(-0.1), RiskTier::Low), 0.0);
    }

    #[test]
    fn no_vig_probs_sum_to_one() {
        let (h, d, a) = no_vig_probabilities(2.10, 3.40, 3.60).unwrap();
        assert!((h + d + a - 1.0).abs() < 1e-9);
        assert!(h > a);
        assert_eq!(no_vig_probabilities(1.0, 3.0, 3.0), None);
        assert!(edge(0.6, 2.0) > 0.0);
    }

    #[test]
    fn recommendation_picks_best_value_market() {
        let sim = SimulationSummary::new(SimulationParams {
            home_win: 0.55,
            draw: 0.25,
            away_win: 0.20,
            most_likely: Scoreline::new(2, 1),
            over_2_5: 0.5,
            both_teams_score: 0.5,
            top_scores: Vec::new(),
        })
        .unwrap();
        let quotes = MarketQuotes::from_simulation(
            &sim,
            DecimalOdds {
                home: 2.30,
                draw: 3.40,
                away: 4.50,
            },
        );
        let rec = StakeRecommendation::from_quotes(&quotes, &StakingConfig::default());
        assert_eq!(rec.best_market, Some(Outcome::Home));
        assert!(rec.kelly.home.is_some());
        assert_eq!(rec.kelly.draw, None);
        assert_eq!(rec.value_scores.get(Outcome::Draw), 0);
        assert!(rec.stake_fraction > 0.0 && rec.stake_fraction <= rec.kelly.home.unwrap());
    }

    #[test]
    fn recommendation_without_value() {
        let quotes = MarketQuotes {
            home: Some(MarketQuote {
                probability: 0.3,
                decimal_odds: 1.5,
            }),
            ..MarketQuotes::default()
        };
        let rec = StakeRecommendation::from_quotes(&quotes, &StakingConfig::default());
        assert!(!rec.has_value());
        assert_eq!(rec.risk_tier, RiskTier::High);
        assert_eq!(rec.stake_fraction, 0.0);
    }

    proptest! {
        #[test]
        fn prop_kelly_rejects_out_of_domain(p in -2.0f64..3.0, odds in -1.0f64..10.0) {
            if p <= 0.0 || p >= 1.0 || odds <= 1.0 {
                prop_assert_eq!(quarter_kelly(p, odds), None);
            } else if let Some(k) = quarter_kelly(p, odds) {
                prop_assert!(k > 0.0 && k <= 0.25);
            }
        }

        #[test]
        fn prop_ladders_are_monotone(a in 0.0f64..0.5, b in 0.0f64..0.5) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(value_score(Some(lo)) <= value_score(Some(hi)));
            prop_assert!(risk_tier(Some(lo)) <= risk_tier(Some(hi)));
        }
    }
}
