//! Canonical forecast records for the three upstream engines: the rule
//! engine ("Oracle"), the Monte-Carlo simulator ("Tesseract") and the
//! context analysis ("LLMGrade").

use serde::{Deserialize, Serialize};

use crate::adapter::{ContextRecord, OracleRecord, SimulationRecord};
use crate::calibration::Prob3;
use crate::error::{Result, ValidationError, check_positive, check_range};
use crate::score::Scoreline;

const PROBABILITY_SUM_TOLERANCE: f64 = 0.05;

/// Provenance of the rule engine's inputs, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceQuality {
    Default,
    PreviousSeason,
    Calculated,
    ApiOfficial,
}

impl DataSourceQuality {
    /// Multiplier applied to the rule engine's consensus weight.
    pub fn weight_factor(self) -> f64 {
        match self {
            DataSourceQuality::ApiOfficial => 1.2,
            DataSourceQuality::Calculated => 1.0,
            DataSourceQuality::PreviousSeason => 0.8,
            DataSourceQuality::Default => 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Oracle,
    Tesseract,
    LlmGrade,
}

impl Engine {
    pub fn label(self) -> &'static str {
        match self {
            Engine::Oracle => "rule engine",
            Engine::Tesseract => "simulation",
            Engine::LlmGrade => "context analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleParams {
    pub score: Scoreline,
    /// Percent, 0..=100.
    pub confidence: f64,
    pub power_home: f64,
    pub power_away: f64,
    pub data_quality: DataSourceQuality,
    pub confidence_adjustment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OracleRecord")]
pub struct OracleForecast {
    score: Scoreline,
    confidence: f64,
    power_home: f64,
    power_away: f64,
    data_quality: DataSourceQuality,
    confidence_adjustment: f64,
}

impl OracleForecast {
    pub fn new(p: OracleParams) -> Result<Self> {
        Ok(Self {
            score: p.score,
            confidence: check_range("confidence", p.confidence, 0.0, 100.0)?,
            power_home: check_range("power_home", p.power_home, 0.0, 200.0)?,
            power_away: check_range("power_away", p.power_away, 0.0, 200.0)?,
            data_quality: p.data_quality,
            confidence_adjustment: check_range(
                "confidence_adjustment",
                p.confidence_adjustment,
                0.0,
                2.0,
            )?,
        })
    }

    pub fn score(&self) -> Scoreline {
        self.score
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn power_home(&self) -> f64 {
        self.power_home
    }

    pub fn power_away(&self) -> f64 {
        self.power_away
    }

    pub fn power_delta(&self) -> f64 {
        self.power_home - self.power_away
    }

    pub fn data_quality(&self) -> DataSourceQuality {
        self.data_quality
    }

    pub fn confidence_adjustment(&self) -> f64 {
        self.confidence_adjustment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFrequency {
    pub score: Scoreline,
    pub simulations: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub most_likely: Scoreline,
    pub over_2_5: f64,
    pub both_teams_score: f64,
    pub top_scores: Vec<ScoreFrequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SimulationRecord")]
pub struct SimulationSummary {
    home_win: f64,
    draw: f64,
    away_win: f64,
    most_likely: Scoreline,
    over_2_5: f64,
    both_teams_score: f64,
    top_scores: Vec<ScoreFrequency>,
}

impl SimulationSummary {
    pub fn new(p: SimulationParams) -> Result<Self> {
        let home_win = check_range("home_win", p.home_win, 0.0, 1.0)?;
        let draw = check_range("draw", p.draw, 0.0, 1.0)?;
        let away_win = check_range("away_win", p.away_win, 0.0, 1.0)?;
        let sum = home_win + draw + away_win;
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ValidationError::ProbabilitySum { sum });
        }

        let mut top_scores = p.top_scores;
        // Ranked by simulation count, ties in scoreline order for stable output.
        top_scores.sort_by(|a, b| {
            b.simulations
                .cmp(&a.simulations)
                .then(a.score.home.cmp(&b.score.home))
                .then(a.score.away.cmp(&b.score.away))
        });

        Ok(Self {
            home_win,
            draw,
            away_win,
            most_likely: p.most_likely,
            over_2_5: check_range("over_2_5", p.over_2_5, 0.0, 1.0)?,
            both_teams_score: check_range("both_teams_score", p.both_teams_score, 0.0, 1.0)?,
            top_scores,
        })
    }

    pub fn home_win(&self) -> f64 {
        self.home_win
    }

    pub fn draw(&self) -> f64 {
        self.draw
    }

    pub fn away_win(&self) -> f64 {
        self.away_win
    }

    pub fn most_likely(&self) -> Scoreline {
        self.most_likely
    }

    pub fn over_2_5(&self) -> f64 {
        self.over_2_5
    }

    pub fn both_teams_score(&self) -> f64 {
        self.both_teams_score
    }

    pub fn top_scores(&self) -> &[ScoreFrequency] {
        &self.top_scores
    }

    /// Home-win probability on the 0..=100 confidence scale.
    pub fn derived_confidence(&self) -> f64 {
        self.home_win * 100.0
    }

    pub fn total_ranked_simulations(&self) -> u64 {
        self.top_scores.iter().map(|s| s.simulations as u64).sum()
    }

    /// Outcome probabilities renormalized to sum to exactly 1.
    pub fn probabilities(&self) -> Prob3 {
        let sum = (self.home_win + self.draw + self.away_win).max(1e-12);
        Prob3 {
            home: self.home_win / sum,
            draw: self.draw / sum,
            away: self.away_win / sum,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorCategory {
    Injuries,
    Form,
    Motivation,
    Tactics,
    Fatigue,
    Weather,
    HeadToHead,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFactor {
    pub category: FactorCategory,
    pub score: u8,
    #[serde(default)]
    pub note: String,
    pub weight: f64,
}

impl ContextFactor {
    fn validate(&self) -> Result<()> {
        check_range("factor.score", self.score as f64, 1.0, 10.0)?;
        check_positive("factor.weight", self.weight)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierScenario {
    #[serde(default)]
    pub description: String,
    /// Percent, 0..=100.
    pub probability: f64,
    pub impact: u8,
}

impl OutlierScenario {
    fn validate(&self) -> Result<()> {
        check_range("outlier.probability", self.probability, 0.0, 100.0)?;
        check_range("outlier.impact", self.impact as f64, 1.0, 10.0)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextParams {
    pub predicted_score: Option<Scoreline>,
    pub factors: Vec<ContextFactor>,
    pub outliers: Vec<OutlierScenario>,
    pub confidence_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContextRecord")]
pub struct ContextSummary {
    predicted_score: Option<Scoreline>,
    factors: Vec<ContextFactor>,
    outliers: Vec<OutlierScenario>,
    confidence_adjustment: f64,
}

impl ContextSummary {
    pub fn new(p: ContextParams) -> Result<Self> {
        for f in &p.factors {
            f.validate()?;
        }
        for o in &p.outliers {
            o.validate()?;
        }
        Ok(Self {
            predicted_score: p.predicted_score,
            factors: p.factors,
            outliers: p.outliers,
            confidence_adjustment: check_range(
                "confidence_adjustment",
                p.confidence_adjustment,
                -20.0,
                20.0,
            )?,
        })
    }

    pub fn predicted_score(&self) -> Option<Scoreline> {
        self.predicted_score
    }

    pub fn factors(&self) -> &[ContextFactor] {
        &self.factors
    }

    pub fn outliers(&self) -> &[OutlierScenario] {
        &self.outliers
    }

    pub fn confidence_adjustment(&self) -> f64 {
        self.confidence_adjustment
    }

    /// Weight-averaged factor score (1..=10); `None` without factors.
    pub fn aggregate_score(&self) -> Option<f64> {
        let weight_sum: f64 = self.factors.iter().map(|f| f.weight).sum();
        if self.factors.is_empty() || weight_sum <= 0.0 {
            return None;
        }
        let weighted: f64 = self.factors.iter().map(|f| f.score as f64 * f.weight).sum();
        Some(weighted / weight_sum)
    }

    /// The aggregate score on the 0..=100 confidence scale.
    pub fn derived_confidence(&self) -> Option<f64> {
        self.aggregate_score().map(|s| (s * 10.0).clamp(0.0, 100.0))
    }

    /// Expected disruption from outlier scenarios, in 0..=1.
    pub fn outlier_risk(&self) -> f64 {
        self.outliers
            .iter()
            .map(|o| (o.probability / 100.0) * (o.impact as f64 / 10.0))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

/// One forecast from any of the three engines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum Forecast {
    Oracle(OracleForecast),
    Tesseract(SimulationSummary),
    LlmGrade(ContextSummary),
}

impl Forecast {
    pub fn engine(&self) -> Engine {
        match self {
            Forecast::Oracle(_) => Engine::Oracle,
            Forecast::Tesseract(_) => Engine::Tesseract,
            Forecast::LlmGrade(_) => Engine::LlmGrade,
        }
    }
}

/// The rule-engine forecast plus whichever of the other two arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBundle {
    pub rule: OracleForecast,
    pub simulation: Option<SimulationSummary>,
    pub context: Option<ContextSummary>,
}

impl ForecastBundle {
    pub fn from_forecasts(forecasts: impl IntoIterator<Item = Forecast>) -> Result<Self> {
        let mut rule = None;
        let mut simulation = None;
        let mut context = None;
        for forecast in forecasts {
            let engine = forecast.engine();
            let duplicate = match forecast {
                Forecast::Oracle(f) => rule.replace(f).is_some(),
                Forecast::Tesseract(f) => simulation.replace(f).is_some(),
                Forecast::LlmGrade(f) => context.replace(f).is_some(),
            };
            if duplicate {
                return Err(ValidationError::InvalidRecord(format!(
                    "duplicate {} forecast",
                    engine.label()
                )));
            }
        }
        let rule = rule.ok_or_else(|| {
            ValidationError::InvalidRecord("missing rule engine forecast".to_string())
        })?;
        Ok(Self {
            rule,
            simulation,
            context,
        })
    }
}
