//! Challenge generation with validation and a fixed fallback

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::prompts::challenge_prompt;
use super::types::{Challenge, ChallengeSource, ChallengeType, MAX_OPTIONS};
use crate::clients::{LanguageModel, ModelRequest};
use crate::error::{AbleMindError, Result};
use crate::parsing::{ParseOutcome, parse_model_json};

pub const FALLBACK_CHALLENGE_TEXT: &str =
    "An AI assistant gives you an answer you cannot immediately verify. What do you do first?";

pub const FALLBACK_CHALLENGE_OPTIONS: [&str; 4] = [
    "Accept it and move on",
    "Check it against a source I trust",
    "Ask the assistant to explain its reasoning",
    "Work the problem out myself before comparing",
];

/// The one challenge served whenever generation fails
pub fn fallback_challenge() -> Challenge {
    Challenge {
        text: FALLBACK_CHALLENGE_TEXT.to_string(),
        challenge_type: ChallengeType::MultipleChoice,
        options: Some(
            FALLBACK_CHALLENGE_OPTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        source: Some(ChallengeSource::Fallback),
    }
}

/// Shape the model is asked to emit. Every field is optional so a partial
/// reply reaches validation instead of failing deserialization outright.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChallenge {
    #[serde(default)]
    challenge_text: Option<String>,
    #[serde(default)]
    challenge_type: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
}

/// Validate a raw reply into a [`Challenge`].
///
/// The type is derived from whether a populated options list is present;
/// a declared `challengeType` is only used to reject a multiple-choice
/// reply that arrived without options. Extra options beyond the maximum are
/// truncated, too few are rejected.
fn normalize(raw: RawChallenge) -> Result<Challenge> {
    let text = raw.challenge_text.unwrap_or_default();
    let options: Vec<String> = raw
        .options
        .unwrap_or_default()
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if options.is_empty() {
        let declared_mc = raw
            .challenge_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("multipleChoice"));
        if declared_mc {
            return Err(AbleMindError::Validation {
                message: "multipleChoice challenge without options".to_string(),
            });
        }
        return Challenge::open(text);
    }

    let mut options = options;
    if options.len() > MAX_OPTIONS {
        debug!("Truncating {} options to {}", options.len(), MAX_OPTIONS);
        options.truncate(MAX_OPTIONS);
    }
    Challenge::multiple_choice(text, options)
}

/// Produces one challenge per call; never fails outward
#[derive(Clone)]
pub struct ChallengeGenerator {
    model: Arc<dyn LanguageModel>,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl ChallengeGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            temperature: None,
            top_p: None,
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, top_p: Option<f32>) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    pub async fn generate(&self, usage_context: &str, seed: Option<u32>) -> Challenge {
        let seed = seed.unwrap_or_else(rand::random);
        match self.try_generate(usage_context, seed).await {
            Ok(challenge) => challenge.with_source(ChallengeSource::Generated),
            Err(e) => {
                warn!("Challenge generation failed, serving fallback: {}", e);
                fallback_challenge()
            }
        }
    }

    async fn try_generate(&self, usage_context: &str, seed: u32) -> Result<Challenge> {
        let request = ModelRequest::json(challenge_prompt(usage_context, seed))
            .with_seed(seed)
            .with_sampling(self.temperature, self.top_p);

        let response = self
            .model
            .generate(&request)
            .await
            .map_err(|e| AbleMindError::Model {
                message: e.to_string(),
            })?;
        debug!(
            "Challenge generated by {} in {}ms (seed {})",
            response.model, response.latency_ms, seed
        );

        match parse_model_json::<RawChallenge>(&response.text) {
            ParseOutcome::Parsed(raw) => normalize(raw),
            other => Err(AbleMindError::Validation {
                message: other.describe(),
            }),
        }
    }
}
