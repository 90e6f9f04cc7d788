//! Retrospective grading: was a stored prediction right, and did the xG say
//! it deserved to be?

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::calibration::Prob3;
use crate::error::{GradingError, ValidationError, check_range};
use crate::score::{Outcome, Scoreline, parse_score};

const DECISIVE_XG_MARGIN: f64 = 0.3;
const UNLUCKY_XG_MARGIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum XgVerdict {
    Dominant,
    Lucky,
    Unlucky,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    AfterExtraTime,
    AfterPenalties,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Finished | MatchStatus::AfterExtraTime | MatchStatus::AfterPenalties
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub fixture_id: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_score: String,
    #[serde(default)]
    pub consensus_score: Option<u8>,
    /// Home/draw/away probabilities published with the prediction, if any.
    #[serde(default)]
    pub outcome_probabilities: Option<Prob3>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub fixture_id: String,
    pub final_score: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub home_xg: Option<f64>,
    #[serde(default)]
    pub away_xg: Option<f64>,
}

/// The verdict part of a grade, independent of any stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub predicted: Scoreline,
    pub actual: Scoreline,
    pub outcome_correct: bool,
    pub exact_score_correct: bool,
    pub xg_verdict: XgVerdict,
}

/// Audit record; created once per finished fixture and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedPrediction {
    pub prediction: StoredPrediction,
    pub result: MatchResult,
    pub actual_outcome: Outcome,
    pub outcome_correct: bool,
    pub exact_score_correct: bool,
    pub xg_verdict: XgVerdict,
}

impl GradedPrediction {
    /// Base64 SHA-256 over the record's JSON form.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&json);
        Ok(BASE64.encode(digest))
    }
}

pub fn xg_verdict(
    predicted: Outcome,
    outcome_correct: bool,
    home_xg: Option<f64>,
    away_xg: Option<f64>,
) -> XgVerdict {
    let (Some(h), Some(a)) = (home_xg, away_xg) else {
        return XgVerdict::Neutral;
    };
    if !h.is_finite() || !a.is_finite() {
        return XgVerdict::Neutral;
    }
    let diff = h - a;

    match predicted {
        Outcome::Home => {
            if outcome_correct && diff > DECISIVE_XG_MARGIN {
                XgVerdict::Dominant
            } else if outcome_correct && diff < -DECISIVE_XG_MARGIN {
                XgVerdict::Lucky
            } else if !outcome_correct && diff > UNLUCKY_XG_MARGIN {
                XgVerdict::Unlucky
            } else {
                XgVerdict::Neutral
            }
        }
        Outcome::Away => {
            if outcome_correct && diff < -DECISIVE_XG_MARGIN {
                XgVerdict::Dominant
            } else if outcome_correct && diff > DECISIVE_XG_MARGIN {
                XgVerdict::Lucky
            } else if !outcome_correct && diff < -UNLUCKY_XG_MARGIN {
                XgVerdict::Unlucky
            } else {
                XgVerdict::Neutral
            }
        }
        Outcome::Draw => {
            let gap = diff.abs();
            if outcome_correct && gap < DECISIVE_XG_MARGIN {
                XgVerdict::Dominant
            } else if outcome_correct && gap > UNLUCKY_XG_MARGIN {
                XgVerdict::Lucky
            } else if !outcome_correct && gap < DECISIVE_XG_MARGIN {
                XgVerdict::Unlucky
            } else {
                XgVerdict::Neutral
            }
        }
    }
}

/// Grades one prediction. Unparseable scores are a data-integrity failure.
pub fn grade(
    predicted_score: &str,
    actual_score: &str,
    home_xg: Option<f64>,
    away_xg: Option<f64>,
) -> Result<Grade, ValidationError> {
    let predicted = parse_score(predicted_score)?;
    let actual = parse_score(actual_score)?;
    check_xg("home_xg", home_xg)?;
    check_xg("away_xg", away_xg)?;
    let outcome_correct = predicted.outcome() == actual.outcome();
    let exact_score_correct = predicted == actual;
    let verdict = xg_verdict(predicted.outcome(), outcome_correct, home_xg, away_xg);
    Ok(Grade {
        predicted,
        actual,
        outcome_correct,
        exact_score_correct,
        xg_verdict: verdict,
    })
}

/// Absent xG is fine; a reported value must be a real, non-negative number.
fn check_xg(field: &'static str, xg: Option<f64>) -> Result<(), ValidationError> {
    if let Some(v) = xg {
        check_range(field, v, 0.0, f64::INFINITY)?;
    }
    Ok(())
}

pub fn grade_prediction(
    prediction: &StoredPrediction,
    result: &MatchResult,
) -> Result<GradedPrediction, GradingError> {
    if prediction.fixture_id != result.fixture_id {
        return Err(GradingError::FixtureMismatch {
            predicted: prediction.fixture_id.clone(),
            actual: result.fixture_id.clone(),
        });
    }
    if !result.status.is_terminal() {
        return Err(GradingError::NotFinal {
            fixture_id: result.fixture_id.clone(),
            status: format!("{:?}", result.status),
        });
    }

    let g = grade(
        &prediction.predicted_score,
        &result.final_score,
        result.home_xg,
        result.away_xg,
    )?;
    debug!(
        fixture = %result.fixture_id,
        outcome_correct = g.outcome_correct,
        exact = g.exact_score_correct,
        verdict = ?g.xg_verdict,
        "graded prediction"
    );

    Ok(GradedPrediction {
        prediction: prediction.clone(),
        result: result.clone(),
        actual_outcome: g.actual.outcome(),
        outcome_correct: g.outcome_correct,
        exact_score_correct: g.exact_score_correct,
        xg_verdict: g.xg_verdict,
    })
}

/// Grades many fixtures in parallel; results keep input order.
pub fn grade_batch(
    pairs: &[(StoredPrediction, MatchResult)],
) -> Vec<Result<GradedPrediction, GradingError>> {
    pairs
        .par_iter()
        .map(|(prediction, result)| grade_prediction(prediction, result))
        .collect()
}
