use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use matchday_consensus::calibration::AccuracyReport;
use matchday_consensus::grading::{MatchResult, StoredPrediction, grade_batch};

#[derive(Debug, Deserialize)]
struct BatchEntry {
    prediction: StoredPrediction,
    result: MatchResult,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,matchday_consensus=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/grade_batch.json"));

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let entries: Vec<BatchEntry> = serde_json::from_str(&raw).context("invalid batch json")?;
    let pairs: Vec<(StoredPrediction, MatchResult)> = entries
        .into_iter()
        .map(|e| (e.prediction, e.result))
        .collect();
    info!(fixtures = pairs.len(), "grading batch");

    let mut graded = Vec::with_capacity(pairs.len());
    let mut failed = 0usize;
    for ((prediction, _), outcome) in pairs.iter().zip(grade_batch(&pairs)) {
        match outcome {
            Ok(g) => {
                println!(
                    "{} {} vs {}: predicted {} actual {} | outcome {} | exact {} | xG {:?}",
                    prediction.fixture_id,
                    prediction.home_team,
                    prediction.away_team,
                    g.prediction.predicted_score,
                    g.result.final_score,
                    if g.outcome_correct { "hit" } else { "miss" },
                    if g.exact_score_correct { "hit" } else { "miss" },
                    g.xg_verdict
                );
                graded.push(g);
            }
            Err(err) => {
                failed += 1;
                warn!(fixture = %prediction.fixture_id, error = %err, "skipped fixture");
            }
        }
    }

    let report = AccuracyReport::from_graded(&graded);
    println!("Graded: {} (skipped {failed})", report.samples);
    println!("Outcome hit rate: {:.3}", report.outcome_hit_rate);
    println!("Exact score hit rate: {:.3}", report.exact_score_hit_rate);
    for (verdict, count) in &report.verdicts {
        println!("  {verdict:<9} {count}");
    }
    match report.probability {
        Some(p) => println!(
            "Probabilities ({} fixtures): brier {:.4} | log loss {:.4} | favourite hit rate {:.3}",
            p.samples, p.brier, p.log_loss, p.favourite_hit_rate
        ),
        None => println!("Probabilities: none stored"),
    }

    Ok(())
}
