//! Server-side assessment runs

use rmcp::model::{CallToolRequestParam, CallToolResult};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::assessment::{AssessmentRun, RespondOutcome};
use crate::error::{AbleMindError, Result};
use crate::server::AbleMindServer;
use crate::tools::parse_params;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    pub user_id: String,
    pub context: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondParams {
    pub run_id: Uuid,
    pub response: String,
    pub time_spent_ms: u64,
    #[serde(default)]
    pub first_interaction_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIdParams {
    pub run_id: Uuid,
}

impl AbleMindServer {
    pub async fn handle_assessment_start(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: StartParams = parse_params(request)?;
        if self.store.get_user(&params.user_id).await?.is_none() {
            return Err(AbleMindError::NotFound {
                message: format!("user {} not found", params.user_id),
            });
        }

        let run = AssessmentRun::new(
            params.user_id,
            &self.model,
            self.store.clone(),
            &self.run_settings(),
        );
        let (run_id, handle) = self.register_run(run).await;

        let mut run = handle.run.lock().await;
        let started = run.start(&params.context).await;
        let snapshot = run.snapshot();
        drop(run);

        match started {
            Ok(challenge) => Ok(CallToolResult::structured(json!({
                "runId": run_id,
                "challenge": challenge,
                "run": snapshot,
            }))),
            Err(e) => {
                self.forget_run(&run_id).await;
                Err(e)
            }
        }
    }

    pub async fn handle_assessment_respond(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: RespondParams = parse_params(request)?;
        let handle = self.lookup_run(&params.run_id).await?;

        let mut run = handle.run.lock().await;
        let outcome = run
            .respond(
                &params.response,
                params.time_spent_ms,
                params.first_interaction_ms,
            )
            .await;
        let snapshot = run.snapshot();
        drop(run);

        if snapshot.state.is_terminal() {
            debug!("Run {} finished as {:?}", params.run_id, snapshot.state);
            self.forget_run(&params.run_id).await;
        }

        let outcome: RespondOutcome = outcome?;
        Ok(CallToolResult::structured(json!({
            "runId": params.run_id,
            "result": outcome,
            "run": snapshot,
        })))
    }

    pub async fn handle_assessment_abandon(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: RunIdParams = parse_params(request)?;
        let handle = self.lookup_run(&params.run_id).await?;

        // Cancel first so a call in flight under the lock returns promptly
        handle.cancel.cancel();
        let mut run = handle.run.lock().await;
        run.abandon();
        let snapshot = run.snapshot();
        drop(run);
        self.forget_run(&params.run_id).await;

        Ok(CallToolResult::structured(json!({
            "runId": params.run_id,
            "abandoned": true,
            "run": snapshot,
        })))
    }
}
