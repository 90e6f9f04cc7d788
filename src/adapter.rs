//! Wire boundary for upstream forecasts.
//!
//! Producers have shipped several field names for the same value over time
//! (`home_power` vs `power_home`, `p_home` vs `home_win`, ...). Every alias is
//! accepted here and nowhere else; the records are then validated into the
//! canonical types in [`crate::forecast`].

use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, ValidationError};
use crate::forecast::{
    ContextFactor, ContextParams, ContextSummary, DataSourceQuality, Forecast, ForecastBundle,
    OracleForecast, OracleParams, OutlierScenario, ScoreFrequency, SimulationParams,
    SimulationSummary,
};
use crate::score::parse_score;

#[derive(Debug, Clone, Deserialize)]
pub struct OracleRecord {
    #[serde(alias = "score", alias = "oracle_score")]
    pub predicted_score: String,
    #[serde(alias = "confidence_score")]
    pub confidence: f64,
    #[serde(alias = "home_power")]
    pub power_home: f64,
    #[serde(alias = "away_power")]
    pub power_away: f64,
    #[serde(default, alias = "data_source", alias = "data_quality_tag")]
    pub data_quality: Option<String>,
    #[serde(default = "identity_multiplier", alias = "confidence_multiplier")]
    pub confidence_adjustment: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreFrequencyRecord {
    pub score: String,
    #[serde(alias = "count")]
    pub simulations: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationRecord {
    #[serde(alias = "p_home", alias = "home_win_probability")]
    pub home_win: f64,
    #[serde(alias = "p_draw", alias = "draw_probability")]
    pub draw: f64,
    #[serde(alias = "p_away", alias = "away_win_probability")]
    pub away_win: f64,
    #[serde(alias = "most_likely_score", alias = "predicted_score")]
    pub most_likely: String,
    #[serde(alias = "over25", alias = "over_2_5_probability")]
    pub over_2_5: f64,
    #[serde(alias = "btts", alias = "btts_probability")]
    pub both_teams_score: f64,
    #[serde(default, alias = "score_distribution")]
    pub top_scores: Vec<ScoreFrequencyRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextRecord {
    #[serde(default, alias = "score", alias = "context_score")]
    pub predicted_score: Option<String>,
    #[serde(default, alias = "context_factors")]
    pub factors: Vec<ContextFactor>,
    #[serde(default, alias = "outlier_scenarios")]
    pub outliers: Vec<OutlierScenario>,
    #[serde(default, alias = "total_confidence_adjustment")]
    pub confidence_adjustment: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum ForecastEnvelope {
    #[serde(alias = "rule", alias = "rule_engine")]
    Oracle(OracleRecord),
    #[serde(alias = "simulation", alias = "monte_carlo")]
    Tesseract(SimulationRecord),
    #[serde(alias = "llm", alias = "context", alias = "llmgrade")]
    LlmGrade(ContextRecord),
}

fn identity_multiplier() -> f64 {
    1.0
}

pub fn parse_data_quality(raw: &str) -> Result<DataSourceQuality> {
    let key = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
    match key.as_str() {
        "API_OFFICIAL" | "OFFICIAL" | "API" => Ok(DataSourceQuality::ApiOfficial),
        "CALCULATED" | "COMPUTED" => Ok(DataSourceQuality::Calculated),
        "PREVIOUS_SEASON" | "LAST_SEASON" => Ok(DataSourceQuality::PreviousSeason),
        "DEFAULT" | "FALLBACK" => Ok(DataSourceQuality::Default),
        _ => Err(ValidationError::InvalidRecord(format!(
            "unknown data source quality {raw:?}"
        ))),
    }
}

impl TryFrom<OracleRecord> for OracleForecast {
    type Error = ValidationError;

    fn try_from(r: OracleRecord) -> Result<Self> {
        let data_quality = match r.data_quality.as_deref() {
            Some(tag) => parse_data_quality(tag)?,
            None => DataSourceQuality::Default,
        };
        OracleForecast::new(OracleParams {
            score: parse_score(&r.predicted_score)?,
            confidence: r.confidence,
            power_home: r.power_home,
            power_away: r.power_away,
            data_quality,
            confidence_adjustment: r.confidence_adjustment,
        })
    }
}

impl TryFrom<SimulationRecord> for SimulationSummary {
    type Error = ValidationError;

    fn try_from(r: SimulationRecord) -> Result<Self> {
        let top_scores = r
            .top_scores
            .iter()
            .map(|f| {
                Ok(ScoreFrequency {
                    score: parse_score(&f.score)?,
                    simulations: f.simulations,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        SimulationSummary::new(SimulationParams {
            home_win: r.home_win,
            draw: r.draw,
            away_win: r.away_win,
            most_likely: parse_score(&r.most_likely)?,
            over_2_5: r.over_2_5,
            both_teams_score: r.both_teams_score,
            top_scores,
        })
    }
}

impl TryFrom<ContextRecord> for ContextSummary {
    type Error = ValidationError;

    fn try_from(r: ContextRecord) -> Result<Self> {
        let predicted_score = match r.predicted_score.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(parse_score(raw)?),
        };
        ContextSummary::new(ContextParams {
            predicted_score,
            factors: r.factors,
            outliers: r.outliers,
            confidence_adjustment: r.confidence_adjustment,
        })
    }
}

impl TryFrom<ForecastEnvelope> for Forecast {
    type Error = ValidationError;

    fn try_from(envelope: ForecastEnvelope) -> Result<Self> {
        Ok(match envelope {
            ForecastEnvelope::Oracle(r) => Forecast::Oracle(r.try_into()?),
            ForecastEnvelope::Tesseract(r) => Forecast::Tesseract(r.try_into()?),
            ForecastEnvelope::LlmGrade(r) => Forecast::LlmGrade(r.try_into()?),
        })
    }
}

pub fn parse_forecast_json(raw: &str) -> Result<Forecast> {
    let envelope: ForecastEnvelope = serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "rejected forecast record");
        ValidationError::InvalidRecord(e.to_string())
    })?;
    envelope.try_into()
}

/// Parses a JSON array of forecast envelopes into one bundle. Any invalid
/// record fails the whole bundle.
pub fn parse_forecast_bundle_json(raw: &str) -> Result<ForecastBundle> {
    let trimmed = raw.trim();
    let envelopes: Vec<ForecastEnvelope> = serde_json::from_str(trimmed).map_err(|e| {
        warn!(error = %e, "rejected forecast bundle");
        ValidationError::InvalidRecord(e.to_string())
    })?;
    bundle_from_envelopes(envelopes)
}

pub fn bundle_from_envelopes(envelopes: Vec<ForecastEnvelope>) -> Result<ForecastBundle> {
    let forecasts = envelopes
        .into_iter()
        .map(Forecast::try_from)
        .collect::<Result<Vec<_>>>()
        .inspect_err(|e| warn!(error = %e, "forecast failed validation"))?;
    ForecastBundle::from_forecasts(forecasts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Scoreline;

    #[test]
    fn legacy_and_canonical_oracle_names_agree() {
        let canonical = r#"{"engine":"oracle","predicted_score":"2-1","confidence":70,
            "power_home":120,"power_away":90,"data_quality":"API_OFFICIAL"}"#;
        let legacy = r#"{"engine":"rule","score":"2-1","confidence_score":70.0,
            "home_power":120,"away_power":90,"data_source":"official"}"#;
        let a = parse_forecast_json(canonical).unwrap();
        let b = parse_forecast_json(legacy).unwrap();
        assert_eq!(a, b);
        let Forecast::Oracle(o) = a else {
            panic!("expected oracle forecast");
        };
        assert_eq!(o.data_quality(), DataSourceQuality::ApiOfficial);
        assert_eq!(o.confidence_adjustment(), 1.0);
    }

    #[test]
    fn missing_quality_tag_is_default_tier() {
        let raw = r#"{"engine":"oracle","score":"0-0","confidence":40,"power_home":80,"power_away":80}"#;
        let Forecast::Oracle(o) = parse_forecast_json(raw).unwrap() else {
            panic!("expected oracle forecast");
        };
        assert_eq!(o.data_quality(), DataSourceQuality::Default);
    }

    #[test]
    fn unknown_quality_tag_is_rejected() {
        assert!(parse_data_quality("guesswork").is_err());
        assert_eq!(
            parse_data_quality("previous-season").unwrap(),
            DataSourceQuality::PreviousSeason
        );
    }

    #[test]
    fn fractional_confidence_is_kept() {
        let raw = r#"{"engine":"oracle","score":"1-0","confidence":70.5,"power_home":80,"power_away":80}"#;
        let Forecast::Oracle(o) = parse_forecast_json(raw).unwrap() else {
            panic!("expected oracle forecast");
        };
        assert_eq!(o.confidence(), 70.5);

        let over = raw.replace("70.5", "100.5");
        assert!(matches!(
            parse_forecast_json(&over),
            Err(ValidationError::OutOfRange { field: "confidence", .. })
        ));
    }

    #[test]
    fn simulation_aliases_and_validation() {
        let raw = r#"{"engine":"tesseract","p_home":0.55,"p_draw":0.25,"p_away":0.20,
            "most_likely_score":"2-1","over25":0.48,"btts":0.51,
            "score_distribution":[{"score":"1-0","count":800},{"score":"2-1","count":950}]}"#;
        let Forecast::Tesseract(s) = parse_forecast_json(raw).unwrap() else {
            panic!("expected simulation");
        };
        assert_eq!(s.most_likely(), Scoreline::new(2, 1));
        assert_eq!(s.top_scores()[0].simulations, 950);

        let bad_sum = raw.replace("\"p_away\":0.20", "\"p_away\":0.40");
        assert!(matches!(
            parse_forecast_json(&bad_sum),
            Err(ValidationError::ProbabilitySum { .. })
        ));
    }

    #[test]
    fn context_with_blank_score_has_no_scoreline() {
        let raw = r#"{"engine":"llm_grade","score":"  ","context_factors":[
            {"category":"INJURIES","score":7,"note":"","weight":1.0},
            {"category":"SOMETHING_NEW","score":5,"weight":0.5}]}"#;
        let Forecast::LlmGrade(c) = parse_forecast_json(raw).unwrap() else {
            panic!("expected context");
        };
        assert_eq!(c.predicted_score(), None);
        assert_eq!(c.factors().len(), 2);
    }

    #[test]
    fn malformed_score_fails_the_bundle() {
        let raw = r#"[
            {"engine":"oracle","score":"2-1","confidence":70,"power_home":120,"power_away":90},
            {"engine":"tesseract","home_win":0.5,"draw":0.3,"away_win":0.2,
             "most_likely":"two-one","over_2_5":0.4,"both_teams_score":0.5}
        ]"#;
        assert!(matches!(
            parse_forecast_bundle_json(raw),
            Err(ValidationError::MalformedScore(_))
        ));
    }
}
