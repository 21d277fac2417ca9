//! One user's pass through the challenge sequence.
//!
//! `AwaitingContext -> GeneratingChallenge -> AwaitingResponse ->
//! (ScoringAndAdjusting -> GeneratingChallenge -> AwaitingResponse)* ->
//! Aggregating -> Complete`, with `Abandoned` reachable from any
//! non-terminal state. Each run owns a cancellation token that is bound to
//! every model call it makes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::aggregator::{AggregateOutcome, SessionAggregator, SessionMeta};
use super::difficulty::{DifficultyAdjuster, DifficultyAdjustment};
use super::generator::ChallengeGenerator;
use super::performance::estimate;
use super::types::{BehavioralSample, Challenge, Difficulty, PerformanceScore};
use crate::clients::{GuardedModel, LanguageModel};
use crate::config::Config;
use crate::error::{AbleMindError, Result};
use crate::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    AwaitingContext,
    GeneratingChallenge,
    AwaitingResponse,
    ScoringAndAdjusting,
    Aggregating,
    Complete,
    Abandoned,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Abandoned)
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub total_challenges: usize,
    pub initial_difficulty: Difficulty,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            total_challenges: 5,
            initial_difficulty: Difficulty::INITIAL,
            temperature: None,
            top_p: None,
        }
    }
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            total_challenges: config.assessment.total_challenges,
            initial_difficulty: Difficulty::clamped(config.assessment.initial_difficulty as i64),
            temperature: config.model.temperature,
            top_p: config.model.top_p,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredChallenge {
    pub challenge: Challenge,
    pub response: String,
    pub sample: BehavioralSample,
    pub performance: PerformanceScore,
    /// Difficulty in effect while the challenge was shown
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RespondOutcome {
    Next {
        challenge: Challenge,
        adjustment: DifficultyAdjustment,
        performance: PerformanceScore,
        answered: usize,
        total: usize,
    },
    Complete {
        outcome: AggregateOutcome,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub user_id: String,
    pub state: RunState,
    pub difficulty: Difficulty,
    pub answered: usize,
    pub total: usize,
    pub current_challenge: Option<Challenge>,
}

pub struct AssessmentRun {
    id: Uuid,
    user_id: String,
    state: RunState,
    usage_context: String,
    difficulty: Difficulty,
    total: usize,
    current: Option<Challenge>,
    answered: Vec<AnsweredChallenge>,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    generator: ChallengeGenerator,
    adjuster: DifficultyAdjuster,
    aggregator: SessionAggregator,
    store: Arc<dyn SessionStore>,
    outcome: Option<AggregateOutcome>,
}

impl AssessmentRun {
    pub fn new(
        user_id: impl Into<String>,
        model: &GuardedModel,
        store: Arc<dyn SessionStore>,
        settings: &RunSettings,
    ) -> Self {
        let cancel = CancellationToken::new();
        let model: Arc<dyn LanguageModel> = Arc::new(model.with_cancellation(cancel.clone()));
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            state: RunState::AwaitingContext,
            usage_context: String::new(),
            difficulty: settings.initial_difficulty,
            total: settings.total_challenges.max(1),
            current: None,
            answered: Vec::with_capacity(settings.total_challenges),
            started_at: Utc::now(),
            cancel,
            generator: ChallengeGenerator::new(model.clone())
                .with_sampling(settings.temperature, settings.top_p),
            adjuster: DifficultyAdjuster::new(model.clone()),
            aggregator: SessionAggregator::new(model),
            store,
            outcome: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn current_challenge(&self) -> Option<&Challenge> {
        self.current.as_ref()
    }

    pub fn answered(&self) -> &[AnsweredChallenge] {
        &self.answered
    }

    pub fn outcome(&self) -> Option<&AggregateOutcome> {
        self.outcome.as_ref()
    }

    /// Cancelling this token abandons the run and interrupts its model calls
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.id,
            user_id: self.user_id.clone(),
            state: self.state,
            difficulty: self.difficulty,
            answered: self.answered.len(),
            total: self.total,
            current_challenge: self.current.clone(),
        }
    }

    pub async fn start(&mut self, usage_context: &str) -> Result<Challenge> {
        self.expect_state(RunState::AwaitingContext, "start")?;
        let context = usage_context.trim();
        if context.is_empty() {
            self.abandon();
            return Err(AbleMindError::Validation {
                message: "usage context is required".to_string(),
            });
        }
        self.usage_context = context.to_string();
        self.started_at = Utc::now();
        info!("Run {} started for user {} ({})", self.id, self.user_id, context);

        self.state = RunState::GeneratingChallenge;
        let challenge = self.generator.generate(&self.usage_context, None).await;
        self.check_cancelled()?;
        self.present(challenge.clone());
        Ok(challenge)
    }

    /// Record the answer to the challenge on screen, then either fetch the
    /// next challenge and difficulty together or, after the last one,
    /// aggregate and persist the session.
    pub async fn respond(
        &mut self,
        response: &str,
        time_spent_ms: u64,
        first_interaction_ms: Option<u64>,
    ) -> Result<RespondOutcome> {
        self.expect_state(RunState::AwaitingResponse, "respond")?;
        let response = response.trim();
        if response.is_empty() {
            return Err(AbleMindError::Validation {
                message: "response is empty".to_string(),
            });
        }
        let challenge = self.current.take().ok_or_else(|| AbleMindError::Internal {
            message: format!("run {} has no challenge on screen", self.id),
        })?;

        let performance = estimate(time_spent_ms);
        let challenge_type = challenge.challenge_type;
        self.answered.push(AnsweredChallenge {
            challenge,
            response: response.to_string(),
            sample: BehavioralSample::from_millis(time_spent_ms, first_interaction_ms),
            performance,
            difficulty: self.difficulty,
        });
        self.state = RunState::ScoringAndAdjusting;
        debug!(
            "Run {}: answer {}/{} scored {}",
            self.id,
            self.answered.len(),
            self.total,
            performance.value()
        );

        if self.answered.len() < self.total {
            let (adjustment, next) = tokio::join!(
                self.adjuster
                    .adjust(self.difficulty, performance, challenge_type.as_str()),
                self.generator.generate(&self.usage_context, None),
            );
            self.check_cancelled()?;
            self.difficulty = adjustment.new_difficulty;
            self.state = RunState::GeneratingChallenge;
            self.present(next.clone());
            return Ok(RespondOutcome::Next {
                challenge: next,
                adjustment,
                performance,
                answered: self.answered.len(),
                total: self.total,
            });
        }

        self.state = RunState::Aggregating;
        let responses: Vec<String> = self.answered.iter().map(|a| a.response.clone()).collect();
        let samples: Vec<BehavioralSample> = self.answered.iter().map(|a| a.sample).collect();
        let meta = SessionMeta {
            user_id: self.user_id.clone(),
            usage_context: self.usage_context.clone(),
            start_time: self.started_at,
        };
        let aggregated = self
            .aggregator
            .aggregate(self.store.as_ref(), meta, &responses, &samples, &self.cancel)
            .await;
        match aggregated {
            Ok(outcome) => {
                self.state = RunState::Complete;
                self.outcome = Some(outcome.clone());
                info!("Run {} complete", self.id);
                Ok(RespondOutcome::Complete { outcome })
            }
            Err(e) => {
                warn!("Run {} ended without a saved session: {}", self.id, e);
                self.state = RunState::Abandoned;
                self.current = None;
                Err(e)
            }
        }
    }

    /// Returns false when the run had already finished
    pub fn abandon(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.cancel.cancel();
        self.state = RunState::Abandoned;
        self.current = None;
        info!("Run {} abandoned", self.id);
        true
    }

    fn present(&mut self, challenge: Challenge) {
        self.current = Some(challenge);
        self.state = RunState::AwaitingResponse;
    }

    fn expect_state(&self, expected: RunState, op: &str) -> Result<()> {
        if self.state != expected {
            return Err(AbleMindError::InvalidState {
                message: format!("cannot {} run {} in state {:?}", op, self.id, self.state),
            });
        }
        Ok(())
    }

    fn check_cancelled(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            self.state = RunState::Abandoned;
            self.current = None;
            return Err(AbleMindError::InvalidState {
                message: format!("run {} was abandoned", self.id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::aggregator::fallback_report;
    use crate::assessment::difficulty::AdjustmentSource;
    use crate::assessment::testing::{CannedModel, OverlapModel, RoutedModel};
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn settings(total: usize) -> RunSettings {
        RunSettings {
            total_challenges: total,
            ..Default::default()
        }
    }

    fn run_with(
        model: impl LanguageModel + 'static,
        store: Arc<MemoryStore>,
        total: usize,
    ) -> AssessmentRun {
        let guarded = GuardedModel::new(Arc::new(model), 2_000);
        AssessmentRun::new("user-1", &guarded, store, &settings(total))
    }

    #[tokio::test]
    async fn test_full_run_persists_once() {
        let store = Arc::new(MemoryStore::new());
        let mut run = run_with(RoutedModel::healthy(), store.clone(), 3);

        let first = run.start("Education").await.unwrap();
        assert_eq!(run.state(), RunState::AwaitingResponse);
        assert_eq!(run.current_challenge(), Some(&first));

        for i in 0..2 {
            match run.respond("docs", 1_000, Some(200)).await.unwrap() {
                RespondOutcome::Next { answered, adjustment, .. } => {
                    assert_eq!(answered, i + 1);
                    assert_eq!(adjustment.source, AdjustmentSource::Model);
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(store.list_sessions("user-1").await.unwrap().is_empty());
        }
        assert_eq!(run.difficulty().value(), 6);

        let outcome = match run.respond("forum", 12_000, None).await.unwrap() {
            RespondOutcome::Complete { outcome } => outcome,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(run.state(), RunState::Complete);
        assert_eq!(outcome.score.value(), 75);
        assert_eq!(run.answered().len(), 3);
        assert_eq!(run.answered()[2].performance.value(), 8);
        assert_eq!(run.answered()[2].sample.hesitation(), 12.0);
        // Difficulty is not touched by aggregation
        assert_eq!(run.difficulty().value(), 6);

        let saved = store.list_sessions("user-1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].usage_context, "Education");
    }

    #[tokio::test]
    async fn test_failing_model_still_completes() {
        let store = Arc::new(MemoryStore::new());
        let mut run = run_with(CannedModel::failing(), store.clone(), 3);

        assert!(run.start("Personal").await.unwrap().is_fallback());
        run.respond("a", 500, None).await.unwrap();
        run.respond("b", 500, None).await.unwrap();
        // Rules path: two strong answers from 5
        assert_eq!(run.difficulty().value(), 7);

        let RespondOutcome::Complete { outcome } = run.respond("c", 500, None).await.unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(outcome.report, fallback_report());
        assert_eq!(outcome.score.value(), 50);
        assert_eq!(store.list_sessions("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_state_guards() {
        let store = Arc::new(MemoryStore::new());
        let mut run = run_with(RoutedModel::healthy(), store.clone(), 1);

        let err = run.respond("early", 100, None).await.unwrap_err();
        assert!(matches!(err, AbleMindError::InvalidState { .. }));

        run.start("Professional").await.unwrap();
        assert!(run.start("Professional").await.is_err());
        assert!(run.respond("   ", 100, None).await.is_err());
        assert_eq!(run.state(), RunState::AwaitingResponse);

        run.respond("done", 100, None).await.unwrap();
        assert_eq!(run.state(), RunState::Complete);
        assert!(run.respond("again", 100, None).await.is_err());
        assert!(!run.abandon());
        assert_eq!(store.list_sessions("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_context_abandons() {
        let store = Arc::new(MemoryStore::new());
        let mut run = run_with(RoutedModel::healthy(), store.clone(), 2);
        assert!(run.start("  ").await.is_err());
        assert_eq!(run.state(), RunState::Abandoned);
        assert!(run.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_abandon_interrupts_in_flight_call() {
        let store = Arc::new(MemoryStore::new());
        let slow = CannedModel::ok(r#"{"challengeText": "Why?"}"#).delayed(Duration::from_secs(30));
        let run = Arc::new(tokio::sync::Mutex::new(run_with(slow, store.clone(), 2)));
        let token = run.lock().await.cancellation_token();

        let task = {
            let run = run.clone();
            tokio::spawn(async move { run.lock().await.start("Education").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, AbleMindError::InvalidState { .. }));
        let run = run.lock().await;
        assert_eq!(run.state(), RunState::Abandoned);
        assert!(run.current_challenge().is_none());
        assert!(store.list_sessions("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_next_difficulty_and_challenge_requested_together() {
        let store = Arc::new(MemoryStore::new());
        let model = Arc::new(OverlapModel::new(Duration::from_millis(50)));
        let guarded = GuardedModel::new(model.clone(), 2_000);
        let mut run = AssessmentRun::new("user-1", &guarded, store, &settings(2));

        run.start("Education").await.unwrap();
        assert_eq!(model.peak(), 1);

        let outcome = run.respond("docs", 1_000, None).await.unwrap();
        assert!(matches!(outcome, RespondOutcome::Next { .. }));
        assert_eq!(model.peak(), 2);
        assert_eq!(run.state(), RunState::AwaitingResponse);
        assert_eq!(run.difficulty().value(), 6);
    }
}
