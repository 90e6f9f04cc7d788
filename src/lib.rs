pub mod adapter;
pub mod calibration;
pub mod config;
pub mod consensus;
pub mod error;
pub mod forecast;
pub mod grading;
pub mod league_params;
pub mod score;
pub mod signal_fusion;
pub mod staking;
pub mod strength;

pub use consensus::{AgreementTier, ConsensusResult, reconcile};
pub use error::{GradingError, ValidationError};
pub use grading::{GradedPrediction, XgVerdict, grade};
pub use score::{Outcome, Scoreline};
pub use staking::{RiskTier, StakeRecommendation, kelly};
