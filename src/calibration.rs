//! Accuracy reporting over graded predictions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grading::{GradedPrediction, XgVerdict};
use crate::score::Outcome;

/// Home/draw/away probabilities for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Most probable outcome; ties go home, then draw.
    pub fn favourite(&self) -> Outcome {
        [Outcome::Draw, Outcome::Away]
            .into_iter()
            .fold(Outcome::Home, |best, o| {
                if self.get(o) > self.get(best) { o } else { best }
            })
    }

    /// Squared distance to the observed result, summed over the three outcomes.
    pub fn brier(&self, actual: Outcome) -> f64 {
        [Outcome::Home, Outcome::Draw, Outcome::Away]
            .into_iter()
            .map(|o| {
                let observed = if o == actual { 1.0 } else { 0.0 };
                (self.get(o) - observed).powi(2)
            })
            .sum()
    }
}

/// How well stored outcome probabilities matched what happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityScore {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    /// Share of fixtures where the favourite outcome happened.
    pub favourite_hit_rate: f64,
}

/// `None` when there is nothing to score.
pub fn score_probabilities(
    pairs: impl IntoIterator<Item = (Prob3, Outcome)>,
) -> Option<ProbabilityScore> {
    let (samples, brier, log_loss, hits) = pairs.into_iter().fold(
        (0usize, 0.0_f64, 0.0_f64, 0usize),
        |(n, brier, log_loss, hits), (p, actual)| {
            (
                n + 1,
                brier + p.brier(actual),
                log_loss - p.get(actual).clamp(1e-12, 1.0).ln(),
                hits + usize::from(p.favourite() == actual),
            )
        },
    );
    if samples == 0 {
        return None;
    }
    let n = samples as f64;
    Some(ProbabilityScore {
        samples,
        brier: brier / n,
        log_loss: log_loss / n,
        favourite_hit_rate: hits as f64 / n,
    })
}

/// How a batch of graded predictions performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub samples: usize,
    pub outcome_hit_rate: f64,
    pub exact_score_hit_rate: f64,
    pub verdicts: BTreeMap<String, usize>,
    /// Only predictions that stored outcome probabilities take part.
    pub probability: Option<ProbabilityScore>,
}

impl AccuracyReport {
    pub fn from_graded(graded: &[GradedPrediction]) -> Self {
        let mut verdicts: BTreeMap<String, usize> = [
            XgVerdict::Dominant,
            XgVerdict::Lucky,
            XgVerdict::Unlucky,
            XgVerdict::Neutral,
        ]
        .into_iter()
        .map(|v| (verdict_key(v).to_string(), 0))
        .collect();

        let mut outcome_hits = 0usize;
        let mut exact_hits = 0usize;
        for g in graded {
            outcome_hits += usize::from(g.outcome_correct);
            exact_hits += usize::from(g.exact_score_correct);
            *verdicts.entry(verdict_key(g.xg_verdict).to_string()).or_insert(0) += 1;
        }

        let rate = |hits: usize| {
            if graded.is_empty() {
                0.0
            } else {
                hits as f64 / graded.len() as f64
            }
        };

        let probability = score_probabilities(graded.iter().filter_map(|g| {
            g.prediction
                .outcome_probabilities
                .map(|p| (p, g.actual_outcome))
        }));

        Self {
            samples: graded.len(),
            outcome_hit_rate: rate(outcome_hits),
            exact_score_hit_rate: rate(exact_hits),
            verdicts,
            probability,
        }
    }

    pub fn verdict_count(&self, verdict: XgVerdict) -> usize {
        self.verdicts.get(verdict_key(verdict)).copied().unwrap_or(0)
    }
}

fn verdict_key(v: XgVerdict) -> &'static str {
    match v {
        XgVerdict::Dominant => "DOMINANT",
        XgVerdict::Lucky => "LUCKY",
        XgVerdict::Unlucky => "UNLUCKY",
        XgVerdict::Neutral => "NEUTRAL",
    }
}
