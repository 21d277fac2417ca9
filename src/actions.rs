//! Stateless client-facing operations.
//!
//! Each returns an [`ActionOutcome`] rather than an error: failures are
//! reported as `{"success": false, "error": "..."}`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::error;

use crate::assessment::{
    BalanceScore, BehavioralSample, Challenge, ChallengeGenerator, Difficulty,
    DifficultyAdjuster, PerformanceScore, RunSettings, SessionAggregator, SessionMeta,
    SessionReport,
};
use crate::clients::LanguageModel;
use crate::error::{AbleMindError, Result};
use crate::store::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome<T> {
    Success(T),
    Failure { error: String },
}

impl<T> ActionOutcome<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        ActionOutcome::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            ActionOutcome::Success(v) => Ok(v),
            ActionOutcome::Failure { error } => Err(AbleMindError::Internal { message: error }),
        }
    }
}

impl<T: Serialize> Serialize for ActionOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct SuccessBody<'a, T> {
            success: bool,
            #[serde(flatten)]
            data: &'a T,
        }

        #[derive(Serialize)]
        struct FailureBody<'a> {
            success: bool,
            error: &'a str,
        }

        match self {
            ActionOutcome::Success(data) => SuccessBody {
                success: true,
                data,
            }
            .serialize(serializer),
            ActionOutcome::Failure { error } => FailureBody {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitialChallenge {
    pub challenge: Challenge,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextChallenge {
    pub new_challenge: Challenge,
    pub new_difficulty: Difficulty,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub report: SessionReport,
    pub human_ai_balance_score: BalanceScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Either one averaged sample or one sample per challenge
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BehavioralData {
    Averaged(BehavioralSample),
    PerChallenge(Vec<BehavioralSample>),
}

impl BehavioralData {
    pub fn samples(&self) -> Vec<BehavioralSample> {
        match self {
            BehavioralData::Averaged(s) => vec![*s],
            BehavioralData::PerChallenge(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub responses: Vec<String>,
    pub behavioral_data: BehavioralData,
    pub context: String,
    /// When set, the session is persisted for this user
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

fn check_range(name: &str, value: i64) -> std::result::Result<(), String> {
    if (1..=10).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be within 1-10, got {}", name, value))
    }
}

#[derive(Clone)]
pub struct Actions {
    generator: ChallengeGenerator,
    adjuster: DifficultyAdjuster,
    aggregator: SessionAggregator,
    store: Arc<dyn SessionStore>,
}

impl Actions {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn SessionStore>,
        settings: &RunSettings,
    ) -> Self {
        Self {
            generator: ChallengeGenerator::new(model.clone())
                .with_sampling(settings.temperature, settings.top_p),
            adjuster: DifficultyAdjuster::new(model.clone()),
            aggregator: SessionAggregator::new(model),
            store,
        }
    }

    pub async fn get_initial_challenge(
        &self,
        usage_context: &str,
    ) -> ActionOutcome<InitialChallenge> {
        if usage_context.trim().is_empty() {
            return ActionOutcome::failure(
                "Failed to generate challenge: usage context is required.",
            );
        }
        let challenge = self.generator.generate(usage_context, None).await;
        ActionOutcome::Success(InitialChallenge { challenge })
    }

    /// Adjusts difficulty and generates the next challenge concurrently
    pub async fn submit_and_get_next_challenge(
        &self,
        usage_context: &str,
        current_difficulty: i64,
        user_performance: i64,
        challenge_type: &str,
    ) -> ActionOutcome<NextChallenge> {
        let checked = check_range("currentDifficulty", current_difficulty)
            .and_then(|_| check_range("userPerformance", user_performance))
            .and_then(|_| {
                if usage_context.trim().is_empty() {
                    Err("usage context is required".to_string())
                } else {
                    Ok(())
                }
            });
        if let Err(reason) = checked {
            error!("submit_and_get_next_challenge rejected: {}", reason);
            return ActionOutcome::failure(format!(
                "Failed to process response and get next challenge: {}.",
                reason
            ));
        }

        let (adjustment, challenge) = tokio::join!(
            self.adjuster.adjust(
                Difficulty::clamped(current_difficulty),
                PerformanceScore::clamped(user_performance),
                challenge_type,
            ),
            self.generator.generate(usage_context, None),
        );
        ActionOutcome::Success(NextChallenge {
            new_challenge: challenge,
            new_difficulty: adjustment.new_difficulty,
            reason: adjustment.reason,
        })
    }

    pub async fn generate_report(&self, request: ReportRequest) -> ActionOutcome<ReportPayload> {
        let samples = request.behavioral_data.samples();
        let report = self
            .aggregator
            .interpret(&request.responses, &samples, &request.context)
            .await;

        let Some(user_id) = request.user_id else {
            return ActionOutcome::Success(ReportPayload {
                human_ai_balance_score: BalanceScore::from_report(&report),
                report,
                session_id: None,
            });
        };

        let meta = SessionMeta {
            user_id,
            usage_context: request.context,
            start_time: request.start_time.unwrap_or_else(Utc::now),
        };
        match SessionAggregator::persist(self.store.as_ref(), meta, report).await {
            Ok(outcome) => ActionOutcome::Success(ReportPayload {
                report: outcome.report,
                human_ai_balance_score: outcome.score,
                session_id: Some(outcome.session.id),
            }),
            Err(e) => {
                error!("generate_report could not persist session: {}", e);
                ActionOutcome::failure(format!("Failed to save session: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::testing::{CannedModel, OverlapModel, RoutedModel};
    use crate::assessment::difficulty::REASON_INCREASED;
    use crate::assessment::fallback_report;
    use crate::store::{MemoryStore, NewUser, SessionRecord, UserRecord};
    use async_trait::async_trait;

    fn actions(model: impl LanguageModel + 'static) -> (Actions, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let actions = Actions::new(Arc::new(model), store.clone(), &RunSettings::default());
        (actions, store)
    }

    #[tokio::test]
    async fn test_initial_challenge_wire_shape() {
        let (actions, _) = actions(RoutedModel::healthy());
        let out = actions.get_initial_challenge("Education").await;
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["challenge"]["challengeType"], "multipleChoice");

        let out = actions.get_initial_challenge(" ").await;
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("Failed to generate challenge"));
    }

    #[tokio::test]
    async fn test_next_challenge_falls_back_on_model_failure() {
        let (actions, _) = actions(CannedModel::failing());
        let ActionOutcome::Success(next) = actions
            .submit_and_get_next_challenge("Personal", 5, 9, "reasoning")
            .await
        else {
            panic!("expected success");
        };
        assert_eq!(next.new_difficulty.value(), 6);
        assert_eq!(next.reason, REASON_INCREASED);
        assert!(next.new_challenge.is_fallback());
    }

    #[tokio::test]
    async fn test_next_challenge_requests_run_together() {
        let model = Arc::new(OverlapModel::new(std::time::Duration::from_millis(50)));
        let actions = Actions::new(
            model.clone(),
            Arc::new(MemoryStore::new()),
            &RunSettings::default(),
        );
        let out = actions
            .submit_and_get_next_challenge("Personal", 5, 9, "reasoning")
            .await
            .into_result()
            .unwrap();
        assert_eq!(model.peak(), 2);
        assert_eq!(out.new_difficulty.value(), 6);
        assert_eq!(out.new_challenge.options().len(), 3);
    }

    #[tokio::test]
    async fn test_next_challenge_rejects_out_of_range() {
        let (actions, _) = actions(RoutedModel::healthy());
        let out = actions
            .submit_and_get_next_challenge("Personal", 0, 9, "reasoning")
            .await;
        assert!(!out.is_success());
    }

    #[tokio::test]
    async fn test_report_without_user_is_not_persisted() {
        let (actions, store) = actions(CannedModel::failing());
        let request: ReportRequest = serde_json::from_value(serde_json::json!({
            "responses": ["a", "b"],
            "behavioralData": {"timeSpent": 6.0, "hesitation": 2.0},
            "context": "Education"
        }))
        .unwrap();
        let ActionOutcome::Success(payload) = actions.generate_report(request).await else {
            panic!("expected success");
        };
        assert_eq!(payload.report, fallback_report());
        assert_eq!(payload.human_ai_balance_score.value(), 50);
        assert!(payload.session_id.is_none());
        assert!(store.list_sessions("anyone").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_with_user_is_persisted() {
        let (actions, store) = actions(RoutedModel::healthy());
        let request: ReportRequest = serde_json::from_value(serde_json::json!({
            "responses": ["a"],
            "behavioralData": [{"timeSpent": 3.0, "hesitation": 1.0}],
            "context": "Professional",
            "userId": "u9"
        }))
        .unwrap();
        let out = actions.generate_report(request).await;
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["humanAiBalanceScore"], 75);
        let saved = store.list_sessions("u9").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(json["sessionId"], saved[0].id.as_str());
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn create_user(&self, _user: NewUser) -> Result<UserRecord> {
            unimplemented!()
        }
        async fn get_user(&self, _id: &str) -> Result<Option<UserRecord>> {
            Ok(None)
        }
        async fn list_users(&self) -> Result<Vec<UserRecord>> {
            Ok(vec![])
        }
        async fn append_session(&self, _session: &SessionRecord) -> Result<()> {
            Err(AbleMindError::Database {
                message: "connection reset".into(),
            })
        }
        async fn list_sessions(&self, _user_id: &str) -> Result<Vec<SessionRecord>> {
            Ok(vec![])
        }
        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_surfaced() {
        let actions = Actions::new(
            Arc::new(RoutedModel::healthy()),
            Arc::new(BrokenStore),
            &RunSettings::default(),
        );
        let request: ReportRequest = serde_json::from_value(serde_json::json!({
            "behavioralData": {"timeSpent": 1.0, "hesitation": 0.5},
            "context": "Personal",
            "userId": "u1"
        }))
        .unwrap();
        match actions.generate_report(request).await {
            ActionOutcome::Failure { error } => assert!(error.contains("connection reset")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
