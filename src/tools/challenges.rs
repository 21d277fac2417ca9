//! Stateless challenge/report tools mirroring the client-facing functions

use rmcp::model::{CallToolRequestParam, CallToolResult};
use serde::Deserialize;

use crate::actions::ReportRequest;
use crate::error::Result;
use crate::server::AbleMindServer;
use crate::tools::parse_params;

#[derive(Debug, Deserialize)]
pub struct InitialChallengeParams {
    pub context: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextChallengeParams {
    pub context: String,
    pub current_difficulty: i64,
    pub user_performance: i64,
    #[serde(default = "default_challenge_type")]
    pub challenge_type: String,
}

fn default_challenge_type() -> String {
    "reasoning".to_string()
}

impl AbleMindServer {
    pub async fn handle_get_initial_challenge(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: InitialChallengeParams = parse_params(request)?;
        let outcome = self.actions.get_initial_challenge(&params.context).await;
        Ok(CallToolResult::structured(serde_json::to_value(&outcome)?))
    }

    pub async fn handle_submit_and_get_next_challenge(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: NextChallengeParams = parse_params(request)?;
        let outcome = self
            .actions
            .submit_and_get_next_challenge(
                &params.context,
                params.current_difficulty,
                params.user_performance,
                &params.challenge_type,
            )
            .await;
        Ok(CallToolResult::structured(serde_json::to_value(&outcome)?))
    }

    pub async fn handle_generate_report(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: ReportRequest = parse_params(request)?;
        let outcome = self.actions.generate_report(params).await;
        Ok(CallToolResult::structured(serde_json::to_value(&outcome)?))
    }
}
