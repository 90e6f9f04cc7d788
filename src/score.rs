use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn mirrored(self) -> Self {
        match self {
            Outcome::Home => Outcome::Away,
            Outcome::Draw => Outcome::Draw,
            Outcome::Away => Outcome::Home,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Home => "home win",
            Outcome::Draw => "draw",
            Outcome::Away => "away win",
        }
    }
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

/// A full-time scoreline in "H-A" form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scoreline {
    pub home: u32,
    pub away: u32,
}

impl Scoreline {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn outcome(self) -> Outcome {
        classify_outcome(self.home, self.away)
    }

    pub fn mirrored(self) -> Self {
        Self {
            home: self.away,
            away: self.home,
        }
    }

    pub fn total_goals(self) -> u32 {
        self.home.saturating_add(self.away)
    }
}

impl fmt::Display for Scoreline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

impl FromStr for Scoreline {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self> {
        let malformed = || ValidationError::MalformedScore(raw.to_string());
        let (h, a) = raw.trim().split_once('-').ok_or_else(malformed)?;
        let home = parse_goals(h).ok_or_else(malformed)?;
        let away = parse_goals(a).ok_or_else(malformed)?;
        Ok(Self { home, away })
    }
}

impl TryFrom<String> for Scoreline {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<Scoreline> for String {
    fn from(score: Scoreline) -> Self {
        score.to_string()
    }
}

pub fn parse_score(raw: &str) -> Result<Scoreline> {
    raw.parse()
}

pub fn format_score(home: u32, away: u32) -> String {
    Scoreline::new(home, away).to_string()
}

/// Outcome of an "H-A" string. Malformed input is an error, never a draw.
pub fn winning_outcome(raw: &str) -> Result<Outcome> {
    parse_score(raw).map(Scoreline::outcome)
}

fn parse_goals(part: &str) -> Option<u32> {
    // `u32::from_str` accepts a leading '+', which is not a valid scoreline.
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse::<u32>().ok()
}
