//! SurrealDB-backed store over WebSocket

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use super::{NewUser, SessionRecord, SessionStore, UserRecord};
use crate::assessment::BalanceScore;
use crate::config::Config;
use crate::error::{AbleMindError, Result};

const USER_FIELDS: &str =
    "meta::id(id) AS id, email, username, onboarding_context, is_admin, created_at";
const SESSION_FIELDS: &str = "meta::id(id) AS id, user_id, usage_context, start_time, end_time, \
     human_ai_balance_score, strengths, weaknesses, insights";

const SCHEMA_SQL: &str = r#"
    DEFINE TABLE users SCHEMAFULL;
    DEFINE FIELD email ON TABLE users TYPE string;
    DEFINE FIELD username ON TABLE users TYPE option<string>;
    DEFINE FIELD onboarding_context ON TABLE users TYPE option<string>;
    DEFINE FIELD is_admin ON TABLE users TYPE bool DEFAULT false;
    DEFINE FIELD created_at ON TABLE users TYPE datetime;
    DEFINE FIELD updated_at ON TABLE users TYPE option<datetime>;
    DEFINE INDEX users_email_idx ON TABLE users FIELDS email UNIQUE;

    DEFINE TABLE sessions SCHEMAFULL;
    DEFINE FIELD user_id ON TABLE sessions TYPE string;
    DEFINE FIELD usage_context ON TABLE sessions TYPE string;
    DEFINE FIELD start_time ON TABLE sessions TYPE datetime;
    DEFINE FIELD end_time ON TABLE sessions TYPE datetime;
    DEFINE FIELD human_ai_balance_score ON TABLE sessions TYPE int
        ASSERT $value >= 0 AND $value <= 100;
    DEFINE FIELD strengths ON TABLE sessions TYPE array<string>;
    DEFINE FIELD weaknesses ON TABLE sessions TYPE array<string>;
    DEFINE FIELD insights ON TABLE sessions TYPE string;
    DEFINE INDEX sessions_user_start_idx ON TABLE sessions FIELDS user_id, start_time;
"#;

/// SurrealDB Ws engine expects host:port without a scheme
fn normalize_ws_url(s: &str) -> String {
    s.strip_prefix("ws://")
        .or_else(|| s.strip_prefix("wss://"))
        .or_else(|| s.strip_prefix("http://"))
        .or_else(|| s.strip_prefix("https://"))
        .unwrap_or(s)
        .trim_end_matches('/')
        .to_string()
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    email: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    onboarding_context: Option<String>,
    #[serde(default)]
    is_admin: bool,
    created_at: surrealdb::sql::Datetime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            email: row.email,
            username: row.username,
            onboarding_context: row.onboarding_context,
            is_admin: row.is_admin,
            created_at: row.created_at.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionRow {
    id: String,
    user_id: String,
    usage_context: String,
    start_time: surrealdb::sql::Datetime,
    end_time: surrealdb::sql::Datetime,
    human_ai_balance_score: i64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    insights: String,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            id: row.id,
            user_id: row.user_id,
            usage_context: row.usage_context,
            start_time: row.start_time.0,
            end_time: row.end_time.0,
            human_ai_balance_score: BalanceScore::from_stored(row.human_ai_balance_score),
            strengths: row.strengths,
            weaknesses: row.weaknesses,
            insights: row.insights,
        }
    }
}

#[derive(Clone)]
pub struct SurrealStore {
    db: Arc<Surreal<Client>>,
}

impl SurrealStore {
    pub async fn connect(config: &Config) -> Result<Self> {
        let url = normalize_ws_url(&config.system.database_url);
        let user = &config.runtime.database_user;
        let ns = &config.system.database_ns;
        let dbname = &config.system.database_db;
        info!("Connecting to SurrealDB at {} ({}/{})", url, ns, dbname);

        let db = Surreal::new::<Ws>(url.as_str())
            .await
            .map_err(|e| AbleMindError::Database {
                message: format!(
                    "Failed to connect to SurrealDB at {}: {}",
                    config.system.database_url, e
                ),
            })?;

        db.signin(Root {
            username: user.as_str(),
            password: config.runtime.database_pass.as_str(),
        })
        .await
        .with_context(|| format!("Failed to authenticate with SurrealDB as user '{}'", user))?;

        db.use_ns(ns)
            .await
            .with_context(|| format!("Failed to select namespace '{}'", ns))?;
        db.use_db(dbname)
            .await
            .with_context(|| format!("Failed to select database '{}'", dbname))?;

        let store = Self { db: Arc::new(db) };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Idempotent; `DEFINE` statements overwrite existing definitions
    pub async fn initialize_schema(&self) -> Result<()> {
        info!("Initializing users/sessions schema");
        self.db.query(SCHEMA_SQL).await?.check()?;
        Ok(())
    }
}

fn is_unique_violation(err: &surrealdb::Error) -> bool {
    err.to_string().contains("already contains")
}

#[async_trait]
impl SessionStore for SurrealStore {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let user = user.normalized()?;
        let sql = format!(
            "CREATE users SET email = $email, username = $username, \
             onboarding_context = $ctx, is_admin = $is_admin, created_at = time::now() \
             RETURN {USER_FIELDS};"
        );
        let mut response = self
            .db
            .query(sql)
            .bind(("email", user.email.clone()))
            .bind(("username", user.username))
            .bind(("ctx", user.onboarding_context))
            .bind(("is_admin", user.is_admin))
            .await?;
        let rows: Vec<UserRow> = response.take(0).map_err(|e| {
            if is_unique_violation(&e) {
                AbleMindError::Validation {
                    message: format!("email '{}' is already registered", user.email),
                }
            } else {
                e.into()
            }
        })?;
        let row = rows.into_iter().next().ok_or_else(|| AbleMindError::Database {
            message: "CREATE users returned no row".to_string(),
        })?;
        debug!("Created user {}", row.id);
        Ok(row.into())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {USER_FIELDS} FROM type::thing('users', $id);");
        let rows: Vec<UserRow> = self
            .db
            .query(sql)
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let sql = format!("SELECT {USER_FIELDS} FROM users ORDER BY created_at ASC;");
        let rows: Vec<UserRow> = self.db.query(sql).await?.take(0)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn append_session(&self, session: &SessionRecord) -> Result<()> {
        // CREATE on an explicit record id fails if the id exists
        let mut response = self
            .db
            .query(
                "CREATE type::thing('sessions', $id) SET user_id = $user_id, \
                 usage_context = $ctx, start_time = $start, end_time = $end, \
                 human_ai_balance_score = $score, strengths = $strengths, \
                 weaknesses = $weaknesses, insights = $insights RETURN NONE;",
            )
            .bind(("id", session.id.clone()))
            .bind(("user_id", session.user_id.clone()))
            .bind(("ctx", session.usage_context.clone()))
            .bind(("start", surrealdb::sql::Datetime::from(session.start_time)))
            .bind(("end", surrealdb::sql::Datetime::from(session.end_time)))
            .bind(("score", session.human_ai_balance_score.value() as i64))
            .bind(("strengths", session.strengths.clone()))
            .bind(("weaknesses", session.weaknesses.clone()))
            .bind(("insights", session.insights.clone()))
            .await?;
        if let Some(err) = response.take_errors().into_values().next() {
            return Err(if is_unique_violation(&err) {
                AbleMindError::InvalidState {
                    message: format!("session {} already recorded", session.id),
                }
            } else {
                err.into()
            });
        }
        debug!("Appended session {} for user {}", session.id, session.user_id);
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_FIELDS} FROM sessions WHERE user_id = $user_id ORDER BY start_time ASC;"
        );
        let rows: Vec<SessionRow> = self
            .db
            .query(sql)
            .bind(("user_id", user_id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn health_check(&self) -> Result<()> {
        self.db.query("RETURN 1;").await?.check()?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "surrealdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ws_url() {
        assert_eq!(normalize_ws_url("ws://127.0.0.1:8000"), "127.0.0.1:8000");
        assert_eq!(normalize_ws_url("https://db.example.com/"), "db.example.com");
        assert_eq!(normalize_ws_url("localhost:8000"), "localhost:8000");
    }
}
