//! Reconciles the rule-engine, simulation and context forecasts for one
//! fixture into a single agreement tier, weighting and consensus score.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConsensusConfig;
use crate::forecast::{
    ContextSummary, DataSourceQuality, Engine, ForecastBundle, OracleForecast, SimulationSummary,
};
use crate::score::Scoreline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementTier {
    Low,
    Medium,
    High,
}

impl AgreementTier {
    fn base_score(self) -> i32 {
        match self {
            AgreementTier::High => 80,
            AgreementTier::Medium => 50,
            AgreementTier::Low => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineWeights {
    pub rule: f64,
    pub simulation: f64,
    pub context: f64,
}

impl EngineWeights {
    pub fn sum(&self) -> f64 {
        self.rule + self.simulation + self.context
    }

    /// 1 minus the largest distance of any weight from an even three-way split.
    pub fn balance(&self) -> f64 {
        const EVEN: f64 = 1.0 / 3.0;
        let max_dev = [self.rule, self.simulation, self.context]
            .iter()
            .map(|w| (w - EVEN).abs())
            .fold(0.0_f64, f64::max);
        1.0 - max_dev
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub rule_score: Scoreline,
    pub simulation_score: Option<Scoreline>,
    pub context_score: Option<Scoreline>,
    pub agreement: AgreementTier,
    pub confidence_discrepancy: u8,
    pub disagreement: Option<String>,
    pub weights: EngineWeights,
    pub consensus_score: u8,
}

/// Classifies agreement between the scorelines that are present.
///
/// A single scoreline has nothing to agree with and is LOW.
pub fn agreement_tier(scores: &[Scoreline]) -> AgreementTier {
    if scores.len() < 2 {
        return AgreementTier::Low;
    }
    let distinct: HashSet<Scoreline> = scores.iter().copied().collect();
    match (distinct.len(), scores.len()) {
        (1, _) => AgreementTier::High,
        (2, 3) => AgreementTier::Medium,
        _ => AgreementTier::Low,
    }
}

/// Spread (max - min) of the 0..=100 confidences that are present.
pub fn confidence_discrepancy(confidences: &[f64]) -> u8 {
    if confidences.len() < 2 {
        return 0;
    }
    let max = confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = confidences.iter().copied().fold(f64::INFINITY, f64::min);
    (max - min).round().clamp(0.0, 100.0) as u8
}

pub fn disagreement_narrative(
    rule: Scoreline,
    simulation: Option<Scoreline>,
    context: Option<Scoreline>,
) -> Option<String> {
    let versus_simulation = simulation.and_then(|sim| {
        if rule.outcome() != sim.outcome() {
            Some(outcome_message(rule, Engine::Tesseract, sim))
        } else if rule != sim {
            Some(format!(
                "Scoreline disagreement: rule engine predicts {rule}, simulation predicts {sim} (both a {})",
                rule.outcome().label()
            ))
        } else {
            None
        }
    });
    versus_simulation.or_else(|| {
        context
            .filter(|ctx| ctx.outcome() != rule.outcome())
            .map(|ctx| outcome_message(rule, Engine::LlmGrade, ctx))
    })
}

fn outcome_message(rule: Scoreline, other: Engine, other_score: Scoreline) -> String {
    format!(
        "Outcome disagreement: rule engine predicts {} ({rule}) but {} predicts {} ({other_score})",
        rule.outcome().label(),
        other.label(),
        other_score.outcome().label()
    )
}

/// Normalized engine weights. `simulation_confidence` and
/// `context_confidence` are on the 0..=100 scale; `None` means the forecast
/// (or its confidence) is missing.
pub fn engine_weights(
    cfg: &ConsensusConfig,
    rule_confidence: f64,
    data_quality: DataSourceQuality,
    simulation_confidence: Option<f64>,
    context_confidence: Option<f64>,
) -> EngineWeights {
    let as_unit = |c: Option<f64>| c.map(|v| v / 100.0).unwrap_or(cfg.absent_confidence);

    let mut weights = EngineWeights {
        rule: cfg.base_weight_rule * (rule_confidence / 100.0) * data_quality.weight_factor(),
        simulation: cfg.base_weight_simulation * as_unit(simulation_confidence),
        context: cfg.base_weight_context * as_unit(context_confidence),
    };

    let sum = weights.sum();
    if sum > 0.0 {
        weights.rule /= sum;
        weights.simulation /= sum;
        weights.context /= sum;
    }
    weights
}

pub fn consensus_score(tier: AgreementTier, discrepancy: u8, weights: &EngineWeights) -> u8 {
    let penalty = discrepancy as i32 / 2;
    let bonus = (20.0 * weights.balance()).floor() as i32;
    (tier.base_score() - penalty + bonus).clamp(0, 100) as u8
}

pub fn reconcile(
    rule: &OracleForecast,
    simulation: Option<&SimulationSummary>,
    context: Option<&ContextSummary>,
) -> ConsensusResult {
    reconcile_with(&ConsensusConfig::default(), rule, simulation, context)
}

pub fn reconcile_bundle(cfg: &ConsensusConfig, bundle: &ForecastBundle) -> ConsensusResult {
    reconcile_with(
        cfg,
        &bundle.rule,
        bundle.simulation.as_ref(),
        bundle.context.as_ref(),
    )
}

pub fn reconcile_with(
    cfg: &ConsensusConfig,
    rule: &OracleForecast,
    simulation: Option<&SimulationSummary>,
    context: Option<&ContextSummary>,
) -> ConsensusResult {
    if simulation.is_none() {
        warn!("simulation forecast missing; reconciling with fewer inputs");
    }
    if context.is_none() {
        warn!("context forecast missing; reconciling with fewer inputs");
    }

    let rule_score = rule.score();
    let simulation_score = simulation.map(SimulationSummary::most_likely);
    let context_score = context.and_then(ContextSummary::predicted_score);

    let scores: Vec<Scoreline> = std::iter::once(rule_score)
        .chain(simulation_score)
        .chain(context_score)
        .collect();
    let agreement = agreement_tier(&scores);

    let rule_confidence = rule.confidence();
    let simulation_confidence = simulation.map(SimulationSummary::derived_confidence);
    let context_confidence = context.and_then(ContextSummary::derived_confidence);

    let confidences: Vec<f64> = std::iter::once(rule_confidence)
        .chain(simulation_confidence)
        .chain(context_confidence)
        .collect();
    let discrepancy = confidence_discrepancy(&confidences);

    let disagreement = disagreement_narrative(rule_score, simulation_score, context_score);
    let weights = engine_weights(
        cfg,
        rule_confidence,
        rule.data_quality(),
        simulation_confidence,
        context_confidence,
    );
    let score = consensus_score(agreement, discrepancy, &weights);

    debug!(
        agreement = ?agreement,
        discrepancy,
        consensus_score = score,
        w_rule = weights.rule,
        w_simulation = weights.simulation,
        w_context = weights.context,
        "reconciled forecasts"
    );

    ConsensusResult {
        rule_score,
        simulation_score,
        context_score,
        agreement,
        confidence_discrepancy: discrepancy,
        disagreement,
        weights,
        consensus_score: score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{
        ContextFactor, ContextParams, FactorCategory, OracleParams, SimulationParams,
    };
    use proptest::prelude::*;

    fn s(raw: &str) -> Scoreline {
        raw.parse().unwrap()
    }

    fn oracle(score: &str, confidence: u8, quality: DataSourceQuality) -> OracleForecast {
        OracleForecast::new(OracleParams {
            score: s(score),
            confidence: f64::from(confidence),
            power_home: 120.0,
            power_away: 90.0,
            data_quality: quality,
            confidence_adjustment: 1.0,
        })
        .unwrap()
    }

    fn simulation(most_likely: &str, h: f64, d: f64, a: f64) -> SimulationSummary {
        SimulationSummary::new(SimulationParams {
            home_win: h,
            draw: d,
            away_win: a,
            most_likely: s(most_likely),
            over_2_5: 0.5,
            both_teams_score: 0.5,
            top_scores: Vec::new(),
        })
        .unwrap()
    }

    fn context(score: Option<&str>, factor_score: u8) -> ContextSummary {
        ContextSummary::new(ContextParams {
            predicted_score: score.map(s),
            factors: vec![ContextFactor {
                category: FactorCategory::Form,
                score: factor_score,
                note: String::new(),
                weight: 1.0,
            }],
            outliers: Vec::new(),
            confidence_adjustment: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn agreement_tiers() {
        assert_eq!(agreement_tier(&[s("1-0"), s("1-0")]), AgreementTier::High);
        assert_eq!(agreement_tier(&[s("1-0"), s("1-0"), s("1-0")]), AgreementTier::High);
        assert_eq!(agreement_tier(&[s("1-0"), s("2-0"), s("1-0")]), AgreementTier::Medium);
        assert_eq!(agreement_tier(&[s("1-0"), s("2-0")]), AgreementTier::Low);
        assert_eq!(agreement_tier(&[s("1-0"), s("2-0"), s("3-0")]), AgreementTier::Low);
        assert_eq!(agreement_tier(&[s("1-0")]), AgreementTier::Low);
    }

    #[test]
    fn discrepancy_needs_two_values() {
        assert_eq!(confidence_discrepancy(&[70.0]), 0);
        assert_eq!(confidence_discrepancy(&[70.0, 55.00000000000001, 90.0]), 35);
    }

    #[test]
    fn narrative_prefers_simulation_over_context() {
        let msg = disagreement_narrative(s("1-0"), Some(s("0-2")), Some(s("1-1"))).unwrap();
        assert!(msg.contains("simulation"));
        assert!(msg.contains("away win"));

        let msg = disagreement_narrative(s("2-1"), Some(s("1-0")), Some(s("0-0"))).unwrap();
        assert!(msg.starts_with("Scoreline disagreement"));

        let msg = disagreement_narrative(s("2-1"), Some(s("2-1")), Some(s("0-0"))).unwrap();
        assert!(msg.contains("context analysis"));

        assert_eq!(disagreement_narrative(s("2-1"), Some(s("2-1")), Some(s("3-1"))), None);
        assert_eq!(disagreement_narrative(s("2-1"), None, None), None);
    }

    #[test]
    fn weights_follow_confidence_and_quality() {
        let cfg = ConsensusConfig::default();
        let w = engine_weights(&cfg, 70.0, DataSourceQuality::ApiOfficial, Some(55.0), None);
        assert!((w.sum() - 1.0).abs() < 1e-12);
        let raw_rule = 0.4 * 0.7 * 1.2;
        let raw_sum = raw_rule + 0.3 * 0.55 + 0.3 * 0.5;
        assert!((w.rule - raw_rule / raw_sum).abs() < 1e-12);

        let official = engine_weights(&cfg, 60.0, DataSourceQuality::ApiOfficial, None, None);
        let fallback = engine_weights(&cfg, 60.0, DataSourceQuality::Default, None, None);
        assert!(official.rule > fallback.rule);
    }

    #[test]
    fn zero_weight_sum_is_not_normalized() {
        let cfg = ConsensusConfig {
            absent_confidence: 0.0,
            ..ConsensusConfig::default()
        };
        let w = engine_weights(&cfg, 0.0, DataSourceQuality::Calculated, None, None);
        assert_eq!(w.sum(), 0.0);
        assert!(w.rule.is_finite());
    }

    #[test]
    fn agreeing_official_rule_and_simulation_score_high() {
        let rule = oracle("2-1", 70, DataSourceQuality::ApiOfficial);
        let sim = simulation("2-1", 0.55, 0.25, 0.20);
        let result = reconcile(&rule, Some(&sim), None);
        assert_eq!(result.agreement, AgreementTier::High);
        assert_eq!(result.confidence_discrepancy, 15);
        assert!(result.consensus_score >= 75);
        assert_eq!(result.disagreement, None);
    }

    #[test]
    fn opposite_outcomes_are_low_agreement() {
        let rule = oracle("1-0", 65, DataSourceQuality::Calculated);
        let sim = simulation("0-2", 0.3, 0.2, 0.5);
        let result = reconcile(&rule, Some(&sim), None);
        assert_eq!(result.agreement, AgreementTier::Low);
        let msg = result.disagreement.unwrap();
        assert!(msg.contains("Outcome disagreement"));
        assert!(msg.contains("home win") && msg.contains("away win"));
    }

    #[test]
    fn context_score_takes_part_in_agreement() {
        let rule = oracle("1-1", 50, DataSourceQuality::Calculated);
        let sim = simulation("1-1", 0.3, 0.4, 0.3);
        let ctx = context(Some("2-1"), 6);
        let result = reconcile(&rule, Some(&sim), Some(&ctx));
        assert_eq!(result.agreement, AgreementTier::Medium);
        assert_eq!(result.context_score, Some(s("2-1")));
        // 50, 30 and 60 present.
        assert_eq!(result.confidence_discrepancy, 30);
        assert!(result.disagreement.unwrap().contains("context analysis"));
    }

    #[test]
    fn context_without_score_only_affects_weights() {
        let rule = oracle("2-0", 80, DataSourceQuality::Calculated);
        let sim = simulation("2-0", 0.6, 0.25, 0.15);
        let ctx = context(None, 9);
        let result = reconcile(&rule, Some(&sim), Some(&ctx));
        assert_eq!(result.agreement, AgreementTier::High);
        assert_eq!(result.context_score, None);
        let without = reconcile(&rule, Some(&sim), None);
        assert!(result.weights.context > without.weights.context);
    }

    #[test]
    fn fractional_rule_confidence_is_rounded_in_discrepancy() {
        let rule = OracleForecast::new(OracleParams {
            score: s("2-1"),
            confidence: 70.5,
            power_home: 120.0,
            power_away: 90.0,
            data_quality: DataSourceQuality::ApiOfficial,
            confidence_adjustment: 1.0,
        })
        .unwrap();
        let sim = simulation("2-1", 0.5, 0.3, 0.2);
        let result = reconcile(&rule, Some(&sim), None);
        assert_eq!(result.confidence_discrepancy, 21);
        let raw_rule = 0.4 * 0.705 * 1.2;
        let raw_sum = raw_rule + 0.3 * 0.5 + 0.3 * 0.5;
        assert!((result.weights.rule - raw_rule / raw_sum).abs() < 1e-12);
    }

    #[test]
    fn rule_only_is_low() {
        let rule = oracle("2-0", 80, DataSourceQuality::Calculated);
        let result = reconcile(&rule, None, None);
        assert_eq!(result.agreement, AgreementTier::Low);
        assert_eq!(result.confidence_discrepancy, 0);
    }

    proptest! {
        #[test]
        fn prop_consensus_score_is_clamped(
            tier in prop_oneof![Just(AgreementTier::Low), Just(AgreementTier::Medium), Just(AgreementTier::High)],
            discrepancy in 0u8..=100,
            rule in 0.0f64..=1.0,
            sim in 0.0f64..=1.0,
            ctx in 0.0f64..=1.0,
        ) {
            let weights = EngineWeights { rule, simulation: sim, context: ctx };
            let score = consensus_score(tier, discrepancy, &weights);
            prop_assert!(score <= 100);
            let extreme = EngineWeights { rule: 1.0, simulation: 0.0, context: 0.0 };
            prop_assert!(consensus_score(tier, 100, &extreme) <= 100);
        }

        #[test]
        fn prop_identical_scores_are_high(h in 0u32..6, a in 0u32..6) {
            let score = Scoreline::new(h, a);
            prop_assert_eq!(agreement_tier(&[score, score, score]), AgreementTier::High);
        }

        #[test]
        fn prop_normalized_weights_sum_to_one(
            conf in 1u8..=100,
            sim in proptest::option::of(0.0f64..=100.0),
            ctx in proptest::option::of(10.0f64..=100.0),
        ) {
            let w = engine_weights(&ConsensusConfig::default(), conf as f64, DataSourceQuality::Calculated, sim, ctx);
            prop_assert!((w.sum() - 1.0).abs() < 1e-9);
            for v in [w.rule, w.simulation, w.context] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
