//! Tool handlers for the able-mind MCP server

pub mod assessment;
pub mod challenges;
pub mod users;

use rmcp::model::CallToolRequestParam;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AbleMindError, Result};

/// Deserialize tool arguments; absent arguments read as `{}`
pub(crate) fn parse_params<T: DeserializeOwned>(request: CallToolRequestParam) -> Result<T> {
    let args = request.arguments.unwrap_or_default();
    serde_json::from_value(Value::Object(args)).map_err(|e| AbleMindError::InvalidParams {
        message: format!("Invalid parameters for {}: {}", request.name, e),
    })
}
