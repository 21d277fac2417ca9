//! Core value types of the adaptive assessment loop

use serde::{Deserialize, Serialize};

use crate::error::{AbleMindError, Result};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 10;
pub const MIN_OPTIONS: usize = 3;
pub const MAX_OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeType {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "multipleChoice")]
    MultipleChoice,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Open => "open",
            ChallengeType::MultipleChoice => "multipleChoice",
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a challenge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSource {
    Generated,
    Fallback,
}

/// One micro-challenge shown to the user.
///
/// Construct through [`Challenge::open`] or [`Challenge::multiple_choice`];
/// both enforce the option-count rules, so a value of this type is always
/// schema-conforming.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    #[serde(rename = "challengeText")]
    pub(crate) text: String,
    pub(crate) challenge_type: ChallengeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source: Option<ChallengeSource>,
}

impl Challenge {
    pub fn open(text: impl Into<String>) -> Result<Self> {
        let text = non_empty_text(text.into())?;
        Ok(Self {
            text,
            challenge_type: ChallengeType::Open,
            options: None,
            source: None,
        })
    }

    pub fn multiple_choice(text: impl Into<String>, options: Vec<String>) -> Result<Self> {
        let text = non_empty_text(text.into())?;
        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(AbleMindError::Validation {
                message: format!(
                    "multipleChoice needs {}-{} options, got {}",
                    MIN_OPTIONS,
                    MAX_OPTIONS,
                    options.len()
                ),
            });
        }
        Ok(Self {
            text,
            challenge_type: ChallengeType::MultipleChoice,
            options: Some(options),
            source: None,
        })
    }

    pub fn with_source(mut self, source: ChallengeSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn challenge_type(&self) -> ChallengeType {
        self.challenge_type
    }

    pub fn source(&self) -> Option<ChallengeSource> {
        self.source
    }

    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Some(ChallengeSource::Fallback)
    }
}

fn non_empty_text(text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AbleMindError::Validation {
            message: "challenge text is empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Difficulty level, always within [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u8);

impl Difficulty {
    pub const INITIAL: Difficulty = Difficulty(5);

    pub fn clamped(value: i64) -> Self {
        Difficulty(value.clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8)
    }

    /// Round then clamp; non-finite input has no sensible level
    pub fn from_model_value(value: f64) -> Option<Self> {
        value
            .is_finite()
            .then(|| Self::clamped(value.round() as i64))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Latency-derived performance signal, always within [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceScore(u8);

impl PerformanceScore {
    pub fn clamped(value: i64) -> Self {
        PerformanceScore(value.clamp(1, 10) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Per-challenge timing, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSample")]
pub struct BehavioralSample {
    time_spent: f64,
    hesitation: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSample {
    time_spent: f64,
    hesitation: f64,
}

impl TryFrom<RawSample> for BehavioralSample {
    type Error = AbleMindError;

    fn try_from(raw: RawSample) -> Result<Self> {
        Self::new(raw.time_spent, raw.hesitation)
    }
}

impl BehavioralSample {
    pub fn new(time_spent: f64, hesitation: f64) -> Result<Self> {
        if !time_spent.is_finite() || time_spent < 0.0 {
            return Err(AbleMindError::Validation {
                message: format!("timeSpent must be >= 0, got {}", time_spent),
            });
        }
        if !hesitation.is_finite() || hesitation < 0.0 || hesitation > time_spent {
            return Err(AbleMindError::Validation {
                message: format!(
                    "hesitation must be within [0, timeSpent={}], got {}",
                    time_spent, hesitation
                ),
            });
        }
        Ok(Self {
            time_spent,
            hesitation,
        })
    }

    /// Build from raw timings. Hesitation is the delay until the first
    /// interaction, or the whole response time when none was observed.
    pub fn from_millis(time_spent_ms: u64, first_interaction_ms: Option<u64>) -> Self {
        let hesitation_ms = first_interaction_ms
            .map(|ms| ms.min(time_spent_ms))
            .unwrap_or(time_spent_ms);
        Self {
            time_spent: time_spent_ms as f64 / 1000.0,
            hesitation: hesitation_ms as f64 / 1000.0,
        }
    }

    pub fn time_spent(&self) -> f64 {
        self.time_spent
    }

    pub fn hesitation(&self) -> f64 {
        self.hesitation
    }
}

/// Interpretation of one completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub insights: String,
}

/// Report-level metric in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceScore(u8);

impl BalanceScore {
    pub const NEUTRAL: BalanceScore = BalanceScore(50);

    /// Share of strengths among all listed items; 50 when both lists are empty.
    ///
    /// Counts only. A report with more strengths than weaknesses scores
    /// higher regardless of what the items say.
    pub fn from_counts(strengths: usize, weaknesses: usize) -> Self {
        let total = strengths + weaknesses;
        if total == 0 {
            return Self::NEUTRAL;
        }
        let pct = (100.0 * strengths as f64 / total as f64).round();
        BalanceScore(pct.clamp(0.0, 100.0) as u8)
    }

    pub fn from_report(report: &SessionReport) -> Self {
        Self::from_counts(report.strengths.len(), report.weaknesses.len())
    }

    /// Rehydrate a persisted value
    pub fn from_stored(value: i64) -> Self {
        BalanceScore(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}
