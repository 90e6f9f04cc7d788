use std::env;

use serde::{Deserialize, Serialize};

pub const DEFAULT_KELLY_FRACTION: f64 = 0.25;
pub const DEFAULT_BANKROLL_CAP: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakingConfig {
    pub enabled: bool,
    /// Multiplier applied to the raw Kelly fraction (0.25 = quarter Kelly).
    pub fractional_multiplier: f64,
    /// Hard ceiling on the stake fraction, applied after the multiplier.
    pub bankroll_cap: f64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fractional_multiplier: DEFAULT_KELLY_FRACTION,
            bankroll_cap: DEFAULT_BANKROLL_CAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub base_weight_rule: f64,
    pub base_weight_simulation: f64,
    pub base_weight_context: f64,
    /// Confidence (0..1) assumed for a simulation or context forecast that did not arrive.
    pub absent_confidence: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            base_weight_rule: 0.4,
            base_weight_simulation: 0.3,
            base_weight_context: 0.3,
            absent_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub staking: StakingConfig,
    pub consensus: ConsensusConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let staking_defaults = StakingConfig::default();
        let consensus_defaults = ConsensusConfig::default();

        let staking = StakingConfig {
            enabled: lookup_bool(&lookup, "STAKING_ENABLED", staking_defaults.enabled),
            fractional_multiplier: lookup_f64(
                &lookup,
                "KELLY_FRACTION",
                staking_defaults.fractional_multiplier,
            )
            .clamp(0.05, 1.0),
            bankroll_cap: lookup_f64(&lookup, "KELLY_BANKROLL_CAP", staking_defaults.bankroll_cap)
                .clamp(0.01, 1.0),
        };

        let consensus = ConsensusConfig {
            base_weight_rule: lookup_f64(
                &lookup,
                "CONSENSUS_WEIGHT_RULE",
                consensus_defaults.base_weight_rule,
            )
            .clamp(0.0, 1.0),
            base_weight_simulation: lookup_f64(
                &lookup,
                "CONSENSUS_WEIGHT_SIMULATION",
                consensus_defaults.base_weight_simulation,
            )
            .clamp(0.0, 1.0),
            base_weight_context: lookup_f64(
                &lookup,
                "CONSENSUS_WEIGHT_CONTEXT",
                consensus_defaults.base_weight_context,
            )
            .clamp(0.0, 1.0),
            absent_confidence: lookup_f64(
                &lookup,
                "CONSENSUS_ABSENT_CONFIDENCE",
                consensus_defaults.absent_confidence,
            )
            .clamp(0.0, 1.0),
        };

        Self { staking, consensus }
    }
}

fn lookup_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn lookup_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}
