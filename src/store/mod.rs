//! Document store for users and completed sessions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::{BalanceScore, SessionReport};
use crate::error::{AbleMindError, Result};

pub mod memory;
pub mod surreal;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub onboarding_context: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub onboarding_context: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewUser {
    /// Trim fields, drop blank optionals, and require a plausible email
    pub fn normalized(self) -> Result<Self> {
        let email = self.email.trim().to_lowercase();
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(AbleMindError::Validation {
                message: format!("'{}' is not a valid email address", self.email.trim()),
            });
        }
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Ok(Self {
            email,
            username: clean(self.username),
            onboarding_context: clean(self.onboarding_context),
            is_admin: self.is_admin,
        })
    }
}

/// One completed assessment; written once, never updated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub usage_context: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub human_ai_balance_score: BalanceScore,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub insights: String,
}

impl SessionRecord {
    pub fn from_report(
        user_id: impl Into<String>,
        usage_context: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        report: &SessionReport,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            usage_context: usage_context.into(),
            start_time,
            end_time,
            human_ai_balance_score: BalanceScore::from_report(report),
            strengths: report.strengths.clone(),
            weaknesses: report.weaknesses.clone(),
            insights: report.insights.clone(),
        }
    }
}

/// Create/read access to users and sessions. Sessions are append-only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Fails when a session with the same id already exists
    async fn append_session(&self, session: &SessionRecord) -> Result<()>;

    /// Sessions for one user, oldest first
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>>;

    async fn health_check(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}

/// All users, visible only to an admin requester
pub async fn list_users_as(
    store: &dyn SessionStore,
    requester_id: &str,
) -> Result<Vec<UserRecord>> {
    let requester = store
        .get_user(requester_id)
        .await?
        .ok_or_else(|| AbleMindError::NotFound {
            message: format!("user {} not found", requester_id),
        })?;
    if !requester.is_admin {
        return Err(AbleMindError::Forbidden {
            message: format!("user {} is not an admin", requester_id),
        });
    }
    store.list_users().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalized() {
        let u = NewUser {
            email: "  Ada@Example.COM ".into(),
            username: Some("  ".into()),
            onboarding_context: Some(" Education ".into()),
            is_admin: false,
        }
        .normalized()
        .unwrap();
        assert_eq!(u.email, "ada@example.com");
        assert!(u.username.is_none());
        assert_eq!(u.onboarding_context.as_deref(), Some("Education"));

        for bad in ["", "ada", "@example.com", "ada@localhost"] {
            let r = NewUser {
                email: bad.into(),
                ..Default::default()
            }
            .normalized();
            assert!(r.is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_session_record_scores_report() {
        let report = SessionReport {
            strengths: vec!["a".into(), "b".into(), "c".into()],
            weaknesses: vec!["d".into()],
            insights: "ok".into(),
        };
        let now = Utc::now();
        let rec = SessionRecord::from_report("u1", "Personal", now, now, &report);
        assert_eq!(rec.human_ai_balance_score.value(), 75);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["humanAiBalanceScore"], 75);
        assert_eq!(json["userId"], "u1");
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let store = MemoryStore::new();
        let admin = store
            .create_user(NewUser {
                email: "root@example.com".into(),
                is_admin: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let plain = store
            .create_user(NewUser {
                email: "ada@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(list_users_as(&store, &admin.id).await.unwrap().len(), 2);
        assert!(matches!(
            list_users_as(&store, &plain.id).await,
            Err(AbleMindError::Forbidden { .. })
        ));
        assert!(matches!(
            list_users_as(&store, "nobody").await,
            Err(AbleMindError::NotFound { .. })
        ));
    }
}
