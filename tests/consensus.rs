use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use matchday_consensus::adapter::{ForecastEnvelope, bundle_from_envelopes, parse_forecast_bundle_json};
use matchday_consensus::config::ConsensusConfig;
use matchday_consensus::consensus::reconcile_bundle;
use matchday_consensus::forecast::DataSourceQuality;
use matchday_consensus::{AgreementTier, Scoreline, ValidationError};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[derive(Deserialize)]
struct Case {
    forecasts: Vec<ForecastEnvelope>,
}

#[test]
fn agreeing_rule_and_simulation_reach_high_consensus() {
    let case: Case = serde_json::from_str(&read_fixture("consensus_case.json")).unwrap();
    let bundle = bundle_from_envelopes(case.forecasts).expect("fixture should validate");
    assert!(bundle.context.is_none());
    assert_eq!(bundle.rule.data_quality(), DataSourceQuality::ApiOfficial);

    let result = reconcile_bundle(&ConsensusConfig::default(), &bundle);
    assert_eq!(result.agreement, AgreementTier::High);
    assert_eq!(result.confidence_discrepancy, 15);
    assert!(result.consensus_score >= 75);
    assert_eq!(result.consensus_score, 89);
    assert_eq!(result.disagreement, None);
    assert!((result.weights.sum() - 1.0).abs() < 1e-9);
}

#[test]
fn legacy_field_names_reconcile_like_canonical_ones() {
    let bundle = parse_forecast_bundle_json(&read_fixture("legacy_forecasts.json"))
        .expect("legacy fixture should validate");
    assert_eq!(bundle.rule.data_quality(), DataSourceQuality::PreviousSeason);
    let context = bundle.context.as_ref().expect("context forecast present");
    assert_eq!(context.predicted_score(), Some(Scoreline::new(1, 1)));
    assert_eq!(context.factors().len(), 3);

    let result = reconcile_bundle(&ConsensusConfig::default(), &bundle);
    assert_eq!(result.agreement, AgreementTier::Low);
    assert_eq!(result.confidence_discrepancy, 32);
    assert_eq!(result.consensus_score, 21);
    let msg = result.disagreement.expect("outcomes differ");
    assert!(msg.starts_with("Outcome disagreement"));
    assert!(msg.contains("home win (1-0)"));
    assert!(msg.contains("away win (0-2)"));
}

#[test]
fn invalid_record_stops_the_fixture() {
    let raw = read_fixture("legacy_forecasts.json").replace("\"p_draw\": 0.2", "\"p_draw\": 0.6");
    assert!(matches!(
        parse_forecast_bundle_json(&raw),
        Err(ValidationError::ProbabilitySum { .. })
    ));

    let raw = read_fixture("legacy_forecasts.json").replace("\"confidence_score\": 62", "\"confidence_score\": 162");
    assert!(matches!(
        parse_forecast_bundle_json(&raw),
        Err(ValidationError::OutOfRange { .. })
    ));
}

#[test]
fn bundle_without_rule_forecast_is_rejected() {
    let raw = r#"[{"engine":"tesseract","home_win":0.5,"draw":0.3,"away_win":0.2,
        "most_likely":"1-0","over_2_5":0.4,"both_teams_score":0.5}]"#;
    assert!(matches!(
        parse_forecast_bundle_json(raw),
        Err(ValidationError::InvalidRecord(_))
    ));
}
