use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::score::Scoreline;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueParams {
    pub league_id: u32,
    pub sample_matches: usize,
    pub avg_home_goals: f64,
    pub avg_away_goals: f64,
    // Dixon-Coles rho (typically negative to increase low-score draws).
    pub dc_rho: f64,
}

impl LeagueParams {
    pub fn generic(league_id: u32) -> Self {
        Self {
            league_id,
            sample_matches: 0,
            avg_home_goals: 1.45,
            avg_away_goals: 1.15,
            dc_rho: -0.10,
        }
    }

    pub fn goals_total_base(&self) -> f64 {
        self.avg_home_goals + self.avg_away_goals
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeagueResult {
    pub league_id: u32,
    pub score: Scoreline,
}

// FotMob league ids.
static LEAGUE_PRIORS: Lazy<HashMap<u32, LeagueParams>> = Lazy::new(|| {
    [
        (47, 1.53, 1.28, -0.08),  // Premier League
        (87, 1.45, 1.10, -0.11),  // La Liga
        (54, 1.72, 1.38, -0.06),  // Bundesliga
        (55, 1.45, 1.17, -0.10),  // Serie A
        (53, 1.48, 1.15, -0.09),  // Ligue 1
        (42, 1.70, 1.30, -0.07),  // Champions League
        (77, 1.35, 1.05, -0.12),  // World Cup
    ]
    .into_iter()
    .map(|(league_id, avg_home_goals, avg_away_goals, dc_rho)| {
        (
            league_id,
            LeagueParams {
                league_id,
                sample_matches: 0,
                avg_home_goals,
                avg_away_goals,
                dc_rho,
            },
        )
    })
    .collect()
});

pub fn league_params(league_id: u32) -> LeagueParams {
    LEAGUE_PRIORS
        .get(&league_id)
        .copied()
        .unwrap_or_else(|| LeagueParams::generic(league_id))
}

pub fn known_leagues() -> Vec<u32> {
    let mut ids: Vec<u32> = LEAGUE_PRIORS.keys().copied().collect();
    ids.sort_unstable();
    ids
}

pub fn estimate_league_params(league_id: u32, results: &[LeagueResult]) -> LeagueParams {
    let mut home_goals = 0.0;
    let mut away_goals = 0.0;
    let mut n = 0usize;

    for r in results {
        if r.league_id != league_id {
            continue;
        }
        home_goals += r.score.home as f64;
        away_goals += r.score.away as f64;
        n += 1;
    }

    let prior = league_params(league_id);
    let mut out = prior;
    out.sample_matches = n;
    if n == 0 {
        return out;
    }

    // Shrink small samples toward the prior to avoid wild swings.
    const MIN_N: f64 = 200.0;
    let w = ((n as f64) / MIN_N).clamp(0.0, 1.0);
    let observed_home = home_goals / n as f64;
    let observed_away = away_goals / n as f64;
    out.avg_home_goals = (1.0 - w) * prior.avg_home_goals + w * observed_home;
    out.avg_away_goals = (1.0 - w) * prior.avg_away_goals + w * observed_away;
    // Strength records require strictly positive averages.
    out.avg_home_goals = out.avg_home_goals.max(0.05);
    out.avg_away_goals = out.avg_away_goals.max(0.05);
    out
}
