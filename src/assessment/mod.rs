//! The adaptive challenge/difficulty loop

pub mod aggregator;
pub mod difficulty;
pub mod generator;
pub mod performance;
pub mod prompts;
pub mod run;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{AggregateOutcome, SessionAggregator, SessionMeta, fallback_report};
pub use difficulty::{AdjustmentSource, DifficultyAdjuster, DifficultyAdjustment, apply_rules};
pub use generator::{ChallengeGenerator, fallback_challenge};
pub use performance::estimate;
pub use run::{AssessmentRun, RespondOutcome, RunSettings, RunSnapshot, RunState};
pub use types::{
    BalanceScore, BehavioralSample, Challenge, ChallengeSource, ChallengeType, Difficulty,
    PerformanceScore, SessionReport,
};
