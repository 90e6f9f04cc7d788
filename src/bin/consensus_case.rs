use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use matchday_consensus::adapter::{ForecastEnvelope, bundle_from_envelopes};
use matchday_consensus::config::PipelineConfig;
use matchday_consensus::consensus::reconcile_bundle;
use matchday_consensus::staking::{DecimalOdds, MarketQuotes, StakeRecommendation};

#[derive(Debug, serde::Deserialize)]
struct ConsensusCase {
    #[serde(default)]
    fixture_id: Option<String>,
    forecasts: Vec<ForecastEnvelope>,
    #[serde(default)]
    odds: Option<DecimalOdds>,
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
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/consensus_case.json"));

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let case: ConsensusCase = serde_json::from_str(&raw).context("invalid case json")?;
    let cfg = PipelineConfig::from_env();

    let bundle = bundle_from_envelopes(case.forecasts).context("forecast validation failed")?;
    let consensus = reconcile_bundle(&cfg.consensus, &bundle);

    println!(
        "Fixture: {}",
        case.fixture_id.as_deref().unwrap_or("(unnamed)")
    );
    println!("Rule engine: {}", consensus.rule_score);
    match consensus.simulation_score {
        Some(s) => println!("Simulation: {s}"),
        None => println!("Simulation: insufficient data"),
    }
    if let Some(s) = consensus.context_score {
        println!("Context: {s}");
    }
    println!("Agreement: {:?}", consensus.agreement);
    println!("Discrepancy: {}", consensus.confidence_discrepancy);
    println!(
        "Weights: rule {:.3} / simulation {:.3} / context {:.3}",
        consensus.weights.rule, consensus.weights.simulation, consensus.weights.context
    );
    println!("Consensus score: {}", consensus.consensus_score);
    if let Some(msg) = &consensus.disagreement {
        println!("Note: {msg}");
    }

    if !cfg.staking.enabled {
        return Ok(());
    }
    let (Some(sim), Some(odds)) = (bundle.simulation.as_ref(), case.odds) else {
        println!("Stake: insufficient data");
        return Ok(());
    };
    let quotes = MarketQuotes::from_simulation(sim, odds);
    let rec = StakeRecommendation::from_quotes(&quotes, &cfg.staking);
    match rec.best_market {
        Some(market) => println!(
            "Stake: {:.2}% on {} (value {}/10, risk {:?})",
            rec.stake_fraction * 100.0,
            market.label(),
            rec.value_scores.get(market),
            rec.risk_tier
        ),
        None => println!("Stake: no value bet"),
    }

    Ok(())
}
