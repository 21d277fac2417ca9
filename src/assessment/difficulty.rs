//! Difficulty adjustment: model first, deterministic rules as fallback

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::prompts::difficulty_prompt;
use super::types::{Difficulty, PerformanceScore};
use crate::clients::{LanguageModel, ModelRequest};
use crate::error::{AbleMindError, Result};
use crate::parsing::{ParseOutcome, parse_model_json};

pub const REASON_INCREASED: &str = "Difficulty increased due to strong performance.";
pub const REASON_DECREASED: &str = "Difficulty decreased to better match performance level.";
pub const REASON_UNCHANGED: &str = "Difficulty remains the same due to consistent performance.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSource {
    Model,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub new_difficulty: Difficulty,
    pub reason: String,
    pub source: AdjustmentSource,
}

/// +1 at performance >= 8, -1 at <= 4, otherwise unchanged; always clamped
pub fn apply_rules(current: Difficulty, performance: PerformanceScore) -> DifficultyAdjustment {
    let current = current.value() as i64;
    let (next, reason) = match performance.value() {
        p if p >= 8 => (current + 1, REASON_INCREASED),
        p if p <= 4 => (current - 1, REASON_DECREASED),
        _ => (current, REASON_UNCHANGED),
    };
    DifficultyAdjustment {
        new_difficulty: Difficulty::clamped(next),
        reason: reason.to_string(),
        source: AdjustmentSource::Rules,
    }
}

/// `newDifficulty` is kept as a raw value so a string or null is caught as
/// non-numeric rather than as a schema error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdjustment {
    #[serde(default)]
    new_difficulty: Value,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Clone)]
pub struct DifficultyAdjuster {
    model: Arc<dyn LanguageModel>,
}

impl DifficultyAdjuster {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Never fails; the output is within [1, 10] whichever path produced it
    pub async fn adjust(
        &self,
        current: Difficulty,
        performance: PerformanceScore,
        challenge_type: &str,
    ) -> DifficultyAdjustment {
        match self.ask_model(current, performance, challenge_type).await {
            Ok(adjustment) => adjustment,
            Err(e) => {
                warn!("Difficulty adjustment via model failed, applying rules: {}", e);
                apply_rules(current, performance)
            }
        }
    }

    async fn ask_model(
        &self,
        current: Difficulty,
        performance: PerformanceScore,
        challenge_type: &str,
    ) -> Result<DifficultyAdjustment> {
        let request = ModelRequest::json(difficulty_prompt(current, performance, challenge_type));
        let response = self
            .model
            .generate(&request)
            .await
            .map_err(|e| AbleMindError::Model {
                message: e.to_string(),
            })?;
        debug!("Difficulty reply in {}ms", response.latency_ms);

        let raw = match parse_model_json::<RawAdjustment>(&response.text) {
            ParseOutcome::Parsed(raw) => raw,
            other => {
                return Err(AbleMindError::Validation {
                    message: other.describe(),
                });
            }
        };

        let new_difficulty = raw
            .new_difficulty
            .as_f64()
            .and_then(Difficulty::from_model_value)
            .ok_or_else(|| AbleMindError::Validation {
                message: format!("newDifficulty is not a number: {}", raw.new_difficulty),
            })?;

        let reason = raw
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| apply_rules(current, performance).reason);

        Ok(DifficultyAdjustment {
            new_difficulty,
            reason,
            source: AdjustmentSource::Model,
        })
    }
}
