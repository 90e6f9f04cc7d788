//! Dixon-Coles style team strengths and the bounded context modifiers that
//! adjust them before a fixture is simulated.

use serde::{Deserialize, Serialize};

use crate::calibration::Prob3;
use crate::error::{Result, check_positive, check_range};
use crate::league_params::league_params;
use crate::score::Scoreline;

const MAX_GOALS: u32 = 10;
const MODIFIER_MIN: f64 = 0.5;
const MODIFIER_MAX: f64 = 1.5;
const EXTREME_MIN: f64 = 0.7;
const EXTREME_MAX: f64 = 1.3;

/// Raw fields of a [`TeamStrength`], validated on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamStrengthParams {
    pub attack_home: f64,
    pub defense_home: f64,
    pub attack_away: f64,
    pub defense_away: f64,
    pub home_advantage: f64,
    pub league_avg_home_goals: f64,
    pub league_avg_away_goals: f64,
    pub confidence: f64,
}

impl TeamStrengthParams {
    /// Neutral multipliers with the league's average-goal constants.
    pub fn for_league(league_id: u32) -> Self {
        let league = league_params(league_id);
        Self {
            attack_home: 1.0,
            defense_home: 1.0,
            attack_away: 1.0,
            defense_away: 1.0,
            home_advantage: 1.0,
            league_avg_home_goals: league.avg_home_goals,
            league_avg_away_goals: league.avg_away_goals,
            confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TeamStrengthParams")]
pub struct TeamStrength {
    attack_home: f64,
    defense_home: f64,
    attack_away: f64,
    defense_away: f64,
    home_advantage: f64,
    league_avg_home_goals: f64,
    league_avg_away_goals: f64,
    confidence: f64,
}

impl TeamStrength {
    pub fn new(p: TeamStrengthParams) -> Result<Self> {
        Ok(Self {
            attack_home: check_positive("attack_home", p.attack_home)?,
            defense_home: check_positive("defense_home", p.defense_home)?,
            attack_away: check_positive("attack_away", p.attack_away)?,
            defense_away: check_positive("defense_away", p.defense_away)?,
            home_advantage: check_positive("home_advantage", p.home_advantage)?,
            league_avg_home_goals: check_positive("league_avg_home_goals", p.league_avg_home_goals)?,
            league_avg_away_goals: check_positive("league_avg_away_goals", p.league_avg_away_goals)?,
            confidence: check_range("confidence", p.confidence, 0.0, 1.0)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        Self::new(self.params()).map(|_| ())
    }

    pub fn params(&self) -> TeamStrengthParams {
        TeamStrengthParams {
            attack_home: self.attack_home,
            defense_home: self.defense_home,
            attack_away: self.attack_away,
            defense_away: self.defense_away,
            home_advantage: self.home_advantage,
            league_avg_home_goals: self.league_avg_home_goals,
            league_avg_away_goals: self.league_avg_away_goals,
            confidence: self.confidence,
        }
    }

    pub fn attack_home(&self) -> f64 {
        self.attack_home
    }

    pub fn defense_home(&self) -> f64 {
        self.defense_home
    }

    pub fn attack_away(&self) -> f64 {
        self.attack_away
    }

    pub fn defense_away(&self) -> f64 {
        self.defense_away
    }

    pub fn home_advantage(&self) -> f64 {
        self.home_advantage
    }

    pub fn league_avg_home_goals(&self) -> f64 {
        self.league_avg_home_goals
    }

    pub fn league_avg_away_goals(&self) -> f64 {
        self.league_avg_away_goals
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl TryFrom<TeamStrengthParams> for TeamStrength {
    type Error = crate::error::ValidationError;

    fn try_from(p: TeamStrengthParams) -> Result<Self> {
        Self::new(p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextModifierParams {
    pub home_attack: f64,
    pub home_defense: f64,
    pub away_attack: f64,
    pub away_defense: f64,
    pub confidence: f64,
    pub chaos_factor: f64,
    pub news_relevance: f64,
}

impl Default for ContextModifierParams {
    fn default() -> Self {
        Self {
            home_attack: 1.0,
            home_defense: 1.0,
            away_attack: 1.0,
            away_defense: 1.0,
            confidence: 1.0,
            chaos_factor: 0.0,
            news_relevance: 0.0,
        }
    }
}

/// Multiplicative adjustments produced by context analysis. 1.0 is identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContextModifierParams")]
pub struct ContextModifiers {
    home_attack: f64,
    home_defense: f64,
    away_attack: f64,
    away_defense: f64,
    confidence: f64,
    chaos_factor: f64,
    news_relevance: f64,
}

impl ContextModifiers {
    pub fn new(p: ContextModifierParams) -> Result<Self> {
        Ok(Self {
            home_attack: check_range("home_attack", p.home_attack, MODIFIER_MIN, MODIFIER_MAX)?,
            home_defense: check_range("home_defense", p.home_defense, MODIFIER_MIN, MODIFIER_MAX)?,
            away_attack: check_range("away_attack", p.away_attack, MODIFIER_MIN, MODIFIER_MAX)?,
            away_defense: check_range("away_defense", p.away_defense, MODIFIER_MIN, MODIFIER_MAX)?,
            confidence: check_range("confidence", p.confidence, 0.0, 1.0)?,
            chaos_factor: check_range("chaos_factor", p.chaos_factor, 0.0, 1.0)?,
            news_relevance: check_range("news_relevance", p.news_relevance, 0.0, 1.0)?,
        })
    }

    pub fn identity() -> Self {
        Self {
            home_attack: 1.0,
            home_defense: 1.0,
            away_attack: 1.0,
            away_defense: 1.0,
            confidence: 1.0,
            chaos_factor: 0.0,
            news_relevance: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        Self::new(self.params()).map(|_| ())
    }

    pub fn params(&self) -> ContextModifierParams {
        ContextModifierParams {
            home_attack: self.home_attack,
            home_defense: self.home_defense,
            away_attack: self.away_attack,
            away_defense: self.away_defense,
            confidence: self.confidence,
            chaos_factor: self.chaos_factor,
            news_relevance: self.news_relevance,
        }
    }

    fn multipliers(&self) -> [f64; 4] {
        [
            self.home_attack,
            self.home_defense,
            self.away_attack,
            self.away_defense,
        ]
    }

    pub fn has_impact(&self) -> bool {
        self.multipliers()
            .iter()
            .any(|m| (m - 1.0).abs() > f64::EPSILON)
    }

    pub fn is_extreme(&self) -> bool {
        self.multipliers()
            .iter()
            .any(|m| *m < EXTREME_MIN || *m > EXTREME_MAX)
    }

    /// Mean absolute deviation from identity, scaled by confidence and relevance.
    pub fn impact_score(&self) -> f64 {
        let m = self.multipliers();
        let mad = m.iter().map(|v| (v - 1.0).abs()).sum::<f64>() / m.len() as f64;
        (mad * self.confidence * self.news_relevance).clamp(0.0, 1.0)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn chaos_factor(&self) -> f64 {
        self.chaos_factor
    }

    pub fn news_relevance(&self) -> f64 {
        self.news_relevance
    }
}

impl TryFrom<ContextModifierParams> for ContextModifiers {
    type Error = crate::error::ValidationError;

    fn try_from(p: ContextModifierParams) -> Result<Self> {
        Self::new(p)
    }
}

/// A base strength with modifiers applied. Borrows both inputs so the
/// adjustment can be explained later.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdjustedTeamStrength<'a> {
    pub base: &'a TeamStrength,
    pub modifiers: &'a ContextModifiers,
    pub attack_home: f64,
    pub defense_home: f64,
    pub attack_away: f64,
    pub defense_away: f64,
}

pub fn apply_modifiers<'a>(
    modifiers: &'a ContextModifiers,
    base: &'a TeamStrength,
) -> Result<AdjustedTeamStrength<'a>> {
    base.validate()?;
    modifiers.validate()?;
    Ok(AdjustedTeamStrength {
        base,
        modifiers,
        attack_home: base.attack_home * modifiers.home_attack,
        defense_home: base.defense_home * modifiers.home_defense,
        attack_away: base.attack_away * modifiers.away_attack,
        defense_away: base.defense_away * modifiers.away_defense,
    })
}

impl AdjustedTeamStrength<'_> {
    pub fn home_advantage(&self) -> f64 {
        self.base.home_advantage
    }

    pub fn expected_goals_home(&self) -> f64 {
        self.attack_home
            * self.defense_away
            * self.base.home_advantage
            * self.base.league_avg_home_goals
    }

    pub fn expected_goals_away(&self) -> f64 {
        self.attack_away * self.defense_home * self.base.league_avg_away_goals
    }

    pub fn prediction_confidence(&self) -> f64 {
        self.base.confidence * self.modifiers.confidence * (1.0 - 0.5 * self.modifiers.chaos_factor)
    }

    pub fn outcome_probabilities(&self, rho: f64) -> Prob3 {
        let grid = score_grid(self.expected_goals_home(), self.expected_goals_away(), rho);
        let mut p_home = 0.0_f64;
        let mut p_draw = 0.0_f64;
        let mut p_away = 0.0_f64;
        for (h, row) in grid.iter().enumerate() {
            for (a, p) in row.iter().enumerate() {
                if h > a {
                    p_home += p;
                } else if h == a {
                    p_draw += p;
                } else {
                    p_away += p;
                }
            }
        }
        let sum = (p_home + p_draw + p_away).max(1e-12);
        Prob3 {
            home: p_home / sum,
            draw: p_draw / sum,
            away: p_away / sum,
        }
    }

    pub fn most_likely_score(&self, rho: f64) -> Scoreline {
        let grid = score_grid(self.expected_goals_home(), self.expected_goals_away(), rho);
        let mut best = (Scoreline::new(0, 0), f64::NEG_INFINITY);
        for (h, row) in grid.iter().enumerate() {
            for (a, p) in row.iter().enumerate() {
                if *p > best.1 {
                    best = (Scoreline::new(h as u32, a as u32), *p);
                }
            }
        }
        best.0
    }
}

/// Joint scoreline probabilities for 0..=MAX_GOALS goals per side, with the
/// Dixon-Coles correction on the four low-scoring cells.
fn score_grid(lambda_home: f64, lambda_away: f64, rho: f64) -> Vec<Vec<f64>> {
    let lambda_home = lambda_home.clamp(0.05, 6.0);
    let lambda_away = lambda_away.clamp(0.05, 6.0);
    let home = goal_distribution(lambda_home);
    let away = goal_distribution(lambda_away);

    let mut grid: Vec<Vec<f64>> = home
        .iter()
        .map(|ph| away.iter().map(|pa| ph * pa).collect())
        .collect();
    for (h, a, factor) in [
        (0, 0, 1.0 - lambda_home * lambda_away * rho),
        (0, 1, 1.0 + lambda_home * rho),
        (1, 0, 1.0 + lambda_away * rho),
        (1, 1, 1.0 - rho),
    ] {
        grid[h][a] = (grid[h][a] * factor).max(0.0);
    }
    grid
}

/// Poisson probabilities of 0..=MAX_GOALS goals, built by the
/// `p(k) = p(k - 1) * lambda / k` recurrence.
fn goal_distribution(lambda: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(MAX_GOALS as usize + 1);
    let mut p = (-lambda).exp();
    out.push(p);
    for k in 1..=MAX_GOALS {
        p *= lambda / k as f64;
        out.push(p);
    }
    out
}
