//! Shared doubles for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use able_mind::clients::{GuardedModel, LanguageModel, ModelError, ModelRequest, ModelResponse};
use able_mind::config::Config;
use able_mind::server::AbleMindServer;
use able_mind::store::MemoryStore;
use async_trait::async_trait;

/// Answers each prompt kind with a fixed reply; `None` fails the call
pub struct ScriptedModel {
    challenge: Option<&'static str>,
    difficulty: Option<&'static str>,
    report: Option<&'static str>,
}

impl ScriptedModel {
    pub fn healthy() -> Self {
        Self {
            challenge: Some(
                r#"Here is one: {"challengeText": "Which estimate would you verify first?", "options": ["Cost", "Timeline", "Scope"]}"#,
            ),
            difficulty: Some(r#"{"newDifficulty": 7, "reason": "Quick and accurate."}"#),
            report: Some(
                r#"```json
{"strengths": ["Verification habits", "Pacing", "Source checking"], "weaknesses": ["Over-reliance on summaries"], "insights": "Balanced use overall."}
```"#,
            ),
        }
    }

    pub fn offline() -> Self {
        Self {
            challenge: None,
            difficulty: None,
            report: None,
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let reply = if request.prompt.contains("newDifficulty") {
            self.difficulty
        } else if request.prompt.contains("strengths") {
            self.report
        } else {
            self.challenge
        };
        match reply {
            Some(text) => Ok(ModelResponse {
                text: text.to_string(),
                model: "scripted".into(),
                latency_ms: 1,
            }),
            None => Err(ModelError::Transport("connection refused".into())),
        }
    }

    fn name(&self) -> String {
        "scripted".into()
    }
}

/// Server over an in-memory store; `token` becomes the HTTP bearer token
pub fn test_server(model: ScriptedModel, token: Option<&str>) -> AbleMindServer {
    let mut config = Config::default();
    config.runtime.bearer_token = token.map(str::to_string);
    config.assessment.total_challenges = 2;
    AbleMindServer::new(
        Arc::new(config),
        GuardedModel::new(Arc::new(model), 5_000),
        Arc::new(MemoryStore::new()),
    )
}
