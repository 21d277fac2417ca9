//! User registration, session history and admin listing

use rmcp::model::{CallToolRequestParam, CallToolResult};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::history::load_progress;
use crate::server::AbleMindServer;
use crate::store::{NewUser, list_users_as};
use crate::tools::parse_params;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdParams {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersParams {
    pub requester_id: String,
}

impl AbleMindServer {
    pub async fn handle_register_user(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: NewUser = parse_params(request)?;
        let user = self.store.create_user(params).await?;
        Ok(CallToolResult::structured(json!({ "user": user })))
    }

    pub async fn handle_list_sessions(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: UserIdParams = parse_params(request)?;
        let sessions = self.store.list_sessions(&params.user_id).await?;
        Ok(CallToolResult::structured(json!({
            "userId": params.user_id,
            "total": sessions.len(),
            "sessions": sessions,
        })))
    }

    pub async fn handle_session_progress(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult> {
        let params: UserIdParams = parse_params(request)?;
        let summary = load_progress(self.store.as_ref(), &params.user_id).await?;
        Ok(CallToolResult::structured(serde_json::to_value(&summary)?))
    }

    pub async fn handle_list_users(&self, request: CallToolRequestParam) -> Result<CallToolResult> {
        let params: ListUsersParams = parse_params(request)?;
        let users = list_users_as(self.store.as_ref(), &params.requester_id).await?;
        Ok(CallToolResult::structured(json!({
            "total": users.len(),
            "users": users,
        })))
    }
}
