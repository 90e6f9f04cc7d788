//! Blends partially-missing per-team match statistics into a single model
//! input score, tagging where the number came from.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ValidationError, check_finite};
use crate::score::Scoreline;

const XG_WEIGHT: f64 = 0.7;
const GOALS_WEIGHT: f64 = 0.3;
const SHOTS_ON_TARGET_PER_GOAL: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSource {
    /// Both teams had xG; this team's score is the xG/goals blend.
    Xg,
    /// This team had xG but the opponent did not.
    XgPartial,
    Shots,
    Goals,
}

impl SignalSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalSource::Xg => "XG",
            SignalSource::XgPartial => "XG_PARTIAL",
            SignalSource::Shots => "SHOTS",
            SignalSource::Goals => "GOALS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedSignal {
    pub score: f64,
    pub source: SignalSource,
}

/// One team's statistics for one fixture. `None` means the feed did not
/// report the stat at all; `Some(0.0)` xG is a real value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMatchStats {
    pub expected_goals: Option<f64>,
    pub shots_on_target: Option<u32>,
    pub shots_total: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// A row of a textual stats table, e.g. `("Shots on target", "6", "3")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    #[serde(default)]
    pub group: Option<String>,
    pub name: String,
    pub home: String,
    pub away: String,
}

impl TeamMatchStats {
    pub fn from_stat_rows(rows: &[StatRow], side: Side) -> Self {
        let xg = extract_stat(rows, side, &["xg", "expected goals", "expected goals (xg)"]);
        let sot = extract_stat(rows, side, &["shots on target"]);
        let total = extract_stat(rows, side, &["total shots", "shots"]);
        Self {
            expected_goals: xg,
            shots_on_target: sot.and_then(as_count),
            shots_total: total.and_then(as_count),
        }
    }

    pub fn has_xg(&self) -> bool {
        self.expected_goals.is_some()
    }

    fn validate(&self) -> Result<()> {
        if let Some(xg) = self.expected_goals {
            check_finite("expected_goals", xg)?;
            if xg < 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: "expected_goals",
                    value: xg,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }
}

/// Fuses one team's stats. `opponent_has_xg` only affects the provenance tag,
/// never which branch this team takes.
pub fn fuse_team(
    stats: &TeamMatchStats,
    actual_goals: u32,
    opponent_has_xg: bool,
) -> Result<FusedSignal> {
    stats.validate()?;
    let goals = actual_goals as f64;

    let signal = if let Some(xg) = stats.expected_goals {
        FusedSignal {
            score: XG_WEIGHT * xg + GOALS_WEIGHT * goals,
            source: if opponent_has_xg {
                SignalSource::Xg
            } else {
                SignalSource::XgPartial
            },
        }
    } else if let Some(sot) = stats.shots_on_target.filter(|s| *s > 0) {
        FusedSignal {
            score: sot as f64 / SHOTS_ON_TARGET_PER_GOAL,
            source: SignalSource::Shots,
        }
    } else {
        FusedSignal {
            score: goals,
            source: SignalSource::Goals,
        }
    };
    Ok(signal)
}

pub fn fuse_fixture(
    home: &TeamMatchStats,
    away: &TeamMatchStats,
    final_score: Scoreline,
) -> Result<(FusedSignal, FusedSignal)> {
    let h = fuse_team(home, final_score.home, away.has_xg())?;
    let a = fuse_team(away, final_score.away, home.has_xg())?;
    debug!(
        home_score = h.score,
        home_source = h.source.as_str(),
        away_score = a.score,
        away_source = a.source.as_str(),
        "fused fixture signals"
    );
    Ok((h, a))
}

fn extract_stat(rows: &[StatRow], side: Side, keys: &[&str]) -> Option<f64> {
    for row in rows {
        let name = row.name.trim().to_lowercase();
        if !keys.iter().any(|k| name == *k) {
            continue;
        }
        let cell = match side {
            Side::Home => &row.home,
            Side::Away => &row.away,
        };
        if let Some(v) = parse_stat_cell(cell) {
            return Some(v);
        }
    }
    None
}

fn parse_stat_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let s = s.trim_end_matches('%').replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn as_count(v: f64) -> Option<u32> {
    if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
