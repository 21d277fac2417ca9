//! Domain-specific error types for able-mind

use serde_json::json;
use thiserror::Error;

/// Main error type for the able-mind assessment server
#[derive(Error, Debug)]
pub enum AbleMindError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Model provider error: {message}")]
    Model { message: String },

    #[error("MCP protocol error: {message}")]
    Mcp { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for AbleMindError {
    fn from(err: anyhow::Error) -> Self {
        AbleMindError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AbleMindError {
    fn from(err: serde_json::Error) -> Self {
        AbleMindError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<surrealdb::Error> for AbleMindError {
    fn from(err: surrealdb::Error) -> Self {
        AbleMindError::Database {
            message: err.to_string(),
        }
    }
}

impl From<rmcp::ErrorData> for AbleMindError {
    fn from(err: rmcp::ErrorData) -> Self {
        AbleMindError::Mcp {
            message: err.message.to_string(),
        }
    }
}

impl From<reqwest::Error> for AbleMindError {
    fn from(err: reqwest::Error) -> Self {
        AbleMindError::Model {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

/// Convert AbleMindError to MCP error
impl From<AbleMindError> for rmcp::ErrorData {
    fn from(err: AbleMindError) -> Self {
        use rmcp::model::ErrorCode;

        let (code, label, details) = match err {
            AbleMindError::Config { message } => {
                (ErrorCode::INVALID_PARAMS, "Configuration error", message)
            }
            AbleMindError::Database { message } => {
                (ErrorCode::INTERNAL_ERROR, "Database error", message)
            }
            AbleMindError::Model { message } => {
                (ErrorCode::INTERNAL_ERROR, "Model provider error", message)
            }
            AbleMindError::Mcp { message } => {
                (ErrorCode::INVALID_PARAMS, "MCP protocol error", message)
            }
            AbleMindError::Serialization { message } => {
                (ErrorCode::INTERNAL_ERROR, "Serialization error", message)
            }
            AbleMindError::Timeout {
                operation,
                timeout_ms,
            } => (
                ErrorCode::INTERNAL_ERROR,
                "Operation timeout",
                format!("{operation} timed out after {timeout_ms}ms"),
            ),
            AbleMindError::Validation { message } => {
                (ErrorCode::INVALID_PARAMS, "Validation error", message)
            }
            AbleMindError::InvalidParams { message } => {
                (ErrorCode::INVALID_PARAMS, "Invalid parameters", message)
            }
            AbleMindError::NotFound { message } => {
                (ErrorCode::RESOURCE_NOT_FOUND, "Not found", message)
            }
            AbleMindError::Forbidden { message } => {
                (ErrorCode::INVALID_REQUEST, "Forbidden", message)
            }
            AbleMindError::InvalidState { message } => {
                (ErrorCode::INVALID_REQUEST, "Invalid state", message)
            }
            AbleMindError::Internal { message } => {
                (ErrorCode::INTERNAL_ERROR, "Internal error", message)
            }
        };

        rmcp::ErrorData {
            code,
            message: format!("{label}: {details}").into(),
            data: Some(json!({ "details": details })),
        }
    }
}

/// Result type alias for able-mind operations
pub type Result<T> = std::result::Result<T, AbleMindError>;
