//! Per-user progress over completed sessions

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::store::{SessionRecord, SessionStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub session_id: String,
    /// Chart label, e.g. "Mar 4"
    pub date: String,
    pub start_time: DateTime<Utc>,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub user_id: String,
    pub total_sessions: usize,
    pub latest_score: Option<u8>,
    pub average_score: Option<f64>,
    pub best_score: Option<u8>,
    /// Oldest first
    pub points: Vec<ProgressPoint>,
    /// Newest first
    pub sessions: Vec<SessionRecord>,
}

impl ProgressSummary {
    pub fn from_sessions(user_id: impl Into<String>, mut sessions: Vec<SessionRecord>) -> Self {
        sessions.sort_by_key(|s| s.start_time);

        let points: Vec<ProgressPoint> = sessions
            .iter()
            .map(|s| ProgressPoint {
                session_id: s.id.clone(),
                date: s.start_time.format("%b %-d").to_string(),
                start_time: s.start_time,
                score: s.human_ai_balance_score.value(),
            })
            .collect();

        let scores: Vec<u8> = points.iter().map(|p| p.score).collect();
        let average_score = (!scores.is_empty()).then(|| {
            let sum: u32 = scores.iter().map(|&s| s as u32).sum();
            (sum as f64 / scores.len() as f64 * 10.0).round() / 10.0
        });

        sessions.reverse();
        Self {
            user_id: user_id.into(),
            total_sessions: points.len(),
            latest_score: scores.last().copied(),
            average_score,
            best_score: scores.iter().max().copied(),
            points,
            sessions,
        }
    }
}

pub async fn load_progress(store: &dyn SessionStore, user_id: &str) -> Result<ProgressSummary> {
    let sessions = store.list_sessions(user_id).await?;
    Ok(ProgressSummary::from_sessions(user_id, sessions))
}
