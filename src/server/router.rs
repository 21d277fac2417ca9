use crate::server::AbleMindServer;
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, InitializeRequestParam,
        InitializeResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo, Tool, ToolsCapability,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

fn tool(
    name: &'static str,
    title: &'static str,
    description: &'static str,
    input_schema: Arc<Map<String, Value>>,
    output_schema: Option<Arc<Map<String, Value>>>,
) -> Tool {
    Tool {
        name: name.into(),
        title: Some(title.into()),
        description: Some(description.into()),
        input_schema,
        icons: None,
        annotations: None,
        output_schema,
        meta: None,
    }
}

/// Every tool the server exposes, in listing order
pub fn tool_catalog() -> Vec<Tool> {
    use crate::schemas::*;

    vec![
        tool(
            "get_initial_challenge",
            "Get Initial Challenge",
            "Generate the first micro-challenge for a usage context",
            get_initial_challenge_schema(),
            Some(challenge_output_schema()),
        ),
        tool(
            "submit_and_get_next_challenge",
            "Submit And Get Next Challenge",
            "Adjust difficulty from a performance score and generate the next challenge",
            submit_and_get_next_challenge_schema(),
            None,
        ),
        tool(
            "generate_report",
            "Generate Report",
            "Interpret responses and behavioral data into strengths, weaknesses and insights",
            generate_report_schema(),
            None,
        ),
        tool(
            "assessment_start",
            "Start Assessment",
            "Begin a server-side assessment run for a user and return its first challenge",
            assessment_start_schema(),
            None,
        ),
        tool(
            "assessment_respond",
            "Respond To Challenge",
            "Record the answer to the current challenge; returns the next challenge or the final report",
            assessment_respond_schema(),
            None,
        ),
        tool(
            "assessment_abandon",
            "Abandon Assessment",
            "Abandon a run and cancel its in-flight model calls; nothing is saved",
            run_id_schema(),
            None,
        ),
        tool(
            "register_user",
            "Register User",
            "Create a user record",
            register_user_schema(),
            None,
        ),
        tool(
            "list_sessions",
            "List Sessions",
            "List a user's completed sessions, oldest first",
            user_id_schema(),
            None,
        ),
        tool(
            "session_progress",
            "Session Progress",
            "Balance-score trend and summary for a user",
            user_id_schema(),
            None,
        ),
        tool(
            "list_users",
            "List Users",
            "List all users; the requester must be an admin",
            list_users_schema(),
            None,
        ),
    ]
}

impl ServerHandler for AbleMindServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "able-mind".to_string(),
                title: Some("AbleMind".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
            ..Default::default()
        }
    }

    async fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<InitializeResult, McpError> {
        let mut info = self.get_info();
        info.protocol_version = request.protocol_version.clone();
        Ok(info)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        info!("tools/list requested");
        Ok(ListToolsResult {
            tools: tool_catalog(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.name.as_ref() {
            // Stateless client functions
            "get_initial_challenge" => self
                .handle_get_initial_challenge(request)
                .await
                .map_err(|e| e.into()),
            "submit_and_get_next_challenge" => self
                .handle_submit_and_get_next_challenge(request)
                .await
                .map_err(|e| e.into()),
            "generate_report" => self
                .handle_generate_report(request)
                .await
                .map_err(|e| e.into()),

            // Server-side runs
            "assessment_start" => self
                .handle_assessment_start(request)
                .await
                .map_err(|e| e.into()),
            "assessment_respond" => self
                .handle_assessment_respond(request)
                .await
                .map_err(|e| e.into()),
            "assessment_abandon" => self
                .handle_assessment_abandon(request)
                .await
                .map_err(|e| e.into()),

            // Users and history
            "register_user" => self.handle_register_user(request).await.map_err(|e| e.into()),
            "list_sessions" => self.handle_list_sessions(request).await.map_err(|e| e.into()),
            "session_progress" => self
                .handle_session_progress(request)
                .await
                .map_err(|e| e.into()),
            "list_users" => self.handle_list_users(request).await.map_err(|e| e.into()),
            _ => Err(McpError {
                code: rmcp::model::ErrorCode::METHOD_NOT_FOUND,
                message: format!("Unknown tool: {}", request.name).into(),
                data: None,
            }),
        }
    }
}
