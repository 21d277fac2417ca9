//! Session interpretation, balance scoring and persistence

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::prompts::{interpretation_prompt, sample_averages};
use super::types::{BalanceScore, BehavioralSample, SessionReport};
use crate::clients::{LanguageModel, ModelRequest};
use crate::error::{AbleMindError, Result};
use crate::parsing::{ParseOutcome, parse_model_json};
use crate::store::{SessionRecord, SessionStore};

pub fn fallback_report() -> SessionReport {
    SessionReport {
        strengths: vec![
            "Adaptability in response to varied challenges.".to_string(),
            "Willingness to engage with complex tasks.".to_string(),
        ],
        weaknesses: vec![
            "Occasional hesitation suggests a need for more confident decision-making."
                .to_string(),
            "Response speed could be improved on certain tasks.".to_string(),
        ],
        insights: "This session indicates a solid cognitive foundation. Focusing on building \
                   decisiveness and reducing response time on unfamiliar problems could lead \
                   to significant improvements in overall cognitive balance. Continued \
                   practice will be beneficial."
            .to_string(),
    }
}

/// All three fields are required; a reply missing any of them is rejected
#[derive(Debug, Deserialize)]
struct RawReport {
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    insights: String,
}

fn clean_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_report(raw: RawReport) -> Result<SessionReport> {
    let insights = raw.insights.trim().to_string();
    if insights.is_empty() {
        return Err(AbleMindError::Validation {
            message: "report has no insights".to_string(),
        });
    }
    Ok(SessionReport {
        strengths: clean_items(raw.strengths),
        weaknesses: clean_items(raw.weaknesses),
        insights,
    })
}

/// Who and when, for the persisted record
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub user_id: String,
    pub usage_context: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub report: SessionReport,
    pub score: BalanceScore,
    pub session: SessionRecord,
}

#[derive(Clone)]
pub struct SessionAggregator {
    model: Arc<dyn LanguageModel>,
}

impl SessionAggregator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Never fails; any model or validation problem yields [`fallback_report`]
    pub async fn interpret(
        &self,
        responses: &[String],
        samples: &[BehavioralSample],
        usage_context: &str,
    ) -> SessionReport {
        let averages = sample_averages(samples);
        match self.ask_model(responses, averages, usage_context).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Report interpretation failed, using fallback report: {}", e);
                fallback_report()
            }
        }
    }

    async fn ask_model(
        &self,
        responses: &[String],
        averages: (f64, f64),
        usage_context: &str,
    ) -> Result<SessionReport> {
        let request = ModelRequest::json(interpretation_prompt(responses, averages, usage_context));
        let response = self
            .model
            .generate(&request)
            .await
            .map_err(|e| AbleMindError::Model {
                message: e.to_string(),
            })?;
        debug!("Interpretation reply in {}ms", response.latency_ms);

        match parse_model_json::<RawReport>(&response.text) {
            ParseOutcome::Parsed(raw) => validate_report(raw),
            other => Err(AbleMindError::Validation {
                message: other.describe(),
            }),
        }
    }

    /// Interpret, score and write the session record in a single append.
    /// Nothing is written when `cancel` fires before the write.
    pub async fn aggregate(
        &self,
        store: &dyn SessionStore,
        meta: SessionMeta,
        responses: &[String],
        samples: &[BehavioralSample],
        cancel: &CancellationToken,
    ) -> Result<AggregateOutcome> {
        let report = self.interpret(responses, samples, &meta.usage_context).await;
        if cancel.is_cancelled() {
            return Err(AbleMindError::InvalidState {
                message: format!("session for user {} was abandoned", meta.user_id),
            });
        }
        Self::persist(store, meta, report).await
    }

    pub async fn persist(
        store: &dyn SessionStore,
        meta: SessionMeta,
        report: SessionReport,
    ) -> Result<AggregateOutcome> {
        let session = SessionRecord::from_report(
            meta.user_id,
            meta.usage_context,
            meta.start_time,
            Utc::now(),
            &report,
        );
        store.append_session(&session).await.map_err(|e| AbleMindError::Database {
            message: format!("Failed to save session {}: {}", session.id, e),
        })?;
        info!(
            "Session {} saved for user {} (balance {})",
            session.id,
            session.user_id,
            session.human_ai_balance_score.value()
        );
        Ok(AggregateOutcome {
            score: session.human_ai_balance_score,
            report,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::testing::CannedModel;
    use crate::store::MemoryStore;

    fn samples() -> Vec<BehavioralSample> {
        vec![
            BehavioralSample::new(4.0, 1.0).unwrap(),
            BehavioralSample::new(8.0, 3.0).unwrap(),
        ]
    }

    #[tokio::test]
    async fn test_model_report_used_and_cleaned() {
        let model = Arc::new(CannedModel::ok(
            r#"{"strengths": ["Focus", " ", "Recall", "Speed"], "weaknesses": ["Planning"], "insights": " Steady. "}"#,
        ));
        let agg = SessionAggregator::new(model.clone());
        let report = agg
            .interpret(&["a".into(), "b".into()], &samples(), "Education")
            .await;
        assert_eq!(report.strengths, vec!["Focus", "Recall", "Speed"]);
        assert_eq!(report.insights, "Steady.");
        assert_eq!(BalanceScore::from_report(&report).value(), 75);

        let prompt = &model.seen.lock().unwrap()[0].prompt;
        assert!(prompt.contains("6.00 seconds"));
        assert!(prompt.contains("2.00 seconds"));
    }

    #[tokio::test]
    async fn test_missing_lists_fall_back() {
        let agg = SessionAggregator::new(Arc::new(CannedModel::ok(r#"{"insights": "Solid."}"#)));
        let report = agg.interpret(&["a".into()], &samples(), "Personal").await;
        assert_eq!(report, fallback_report());
        assert_eq!(BalanceScore::from_report(&report).value(), 50);
    }

    #[tokio::test]
    async fn test_empty_lists_are_accepted_when_present() {
        let agg = SessionAggregator::new(Arc::new(CannedModel::ok(
            r#"{"strengths": [], "weaknesses": ["Pacing"], "insights": "Slow start."}"#,
        )));
        let report = agg.interpret(&[], &[], "Personal").await;
        assert!(report.strengths.is_empty());
        assert_eq!(report.weaknesses, vec!["Pacing"]);
    }

    #[tokio::test]
    async fn test_failures_yield_fallback() {
        let agg = SessionAggregator::new(Arc::new(CannedModel::failing()));
        let report = agg.interpret(&[], &[], "Personal").await;
        assert_eq!(report, fallback_report());
        assert_eq!(report.strengths.len(), 2);
        assert_eq!(report.weaknesses.len(), 2);
        assert_eq!(BalanceScore::from_report(&report).value(), 50);

        for text in [
            r#"{"strengths": ["x"]}"#,
            r#"{"strengths": "x", "insights": "y"}"#,
            r#"{"insights": "x"}"#,
            r#"{"strengths": ["a"], "insights": "x"}"#,
            r#"{"weaknesses": ["a"], "insights": "x"}"#,
            "nope",
        ] {
            let agg = SessionAggregator::new(Arc::new(CannedModel::ok(text)));
            assert_eq!(agg.interpret(&[], &[], "Personal").await, fallback_report());
        }
    }

    #[tokio::test]
    async fn test_aggregate_skips_write_once_cancelled() {
        let store = MemoryStore::new();
        let agg = SessionAggregator::new(Arc::new(CannedModel::failing()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let meta = SessionMeta {
            user_id: "u1".into(),
            usage_context: "Personal".into(),
            start_time: Utc::now(),
        };
        let err = agg
            .aggregate(&store, meta, &["a".into()], &samples(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AbleMindError::InvalidState { .. }));
        assert!(store.list_sessions("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_persists_one_record() {
        let store = MemoryStore::new();
        let agg = SessionAggregator::new(Arc::new(CannedModel::ok(
            r#"{"strengths": ["Focus", "Recall", "Speed"], "weaknesses": ["Planning"], "insights": "Steady."}"#,
        )));
        let meta = SessionMeta {
            user_id: "u2".into(),
            usage_context: "Education".into(),
            start_time: Utc::now(),
        };
        let out = agg
            .aggregate(&store, meta, &["a".into()], &samples(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.score.value(), 75);
        assert_eq!(store.list_sessions("u2").await.unwrap(), vec![out.session]);
    }

    #[tokio::test]
    async fn test_persist_writes_one_record() {
        let store = MemoryStore::new();
        let agg = SessionAggregator::new(Arc::new(CannedModel::failing()));
        let start = Utc::now();
        let report = agg.interpret(&["a".into()], &samples()[..1], "Professional").await;
        let out = SessionAggregator::persist(
            &store,
            SessionMeta {
                user_id: "u1".into(),
                usage_context: "Professional".into(),
                start_time: start,
            },
            report,
        )
        .await
        .unwrap();
        assert_eq!(out.score.value(), 50);
        let saved = store.list_sessions("u1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0], out.session);
        assert!(saved[0].end_time >= saved[0].start_time);
    }
}
