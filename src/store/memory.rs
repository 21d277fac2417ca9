//! In-process store for tests and `assess --ephemeral`

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NewUser, SessionRecord, SessionStore, UserRecord};
use crate::error::{AbleMindError, Result};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    sessions: RwLock<Vec<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let user = user.normalized()?;
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AbleMindError::Validation {
                message: format!("email '{}' is already registered", user.email),
            });
        }
        let record = UserRecord {
            id: uuid::Uuid::new_v4().simple().to_string(),
            email: user.email,
            username: user.username,
            onboarding_context: user.onboarding_context,
            is_admin: user.is_admin,
            created_at: Utc::now(),
        };
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn append_session(&self, session: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|s| s.id == session.id) {
            return Err(AbleMindError::InvalidState {
                message: format!("session {} already recorded", session.id),
            });
        }
        sessions.push(session.clone());
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let mut out: Vec<SessionRecord> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.start_time);
        Ok(out)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
